//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::fmt::Write;

/// A convenience wrapper around `Result` for `yangtree::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// NETCONF error-type: the conceptual layer the error was detected at
/// (RFC 6241, section 4.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

/// NETCONF error-tag (RFC 6241, appendix A).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorTag {
    InUse,
    InvalidValue,
    TooBig,
    MissingAttribute,
    BadAttribute,
    UnknownAttribute,
    MissingElement,
    BadElement,
    UnknownElement,
    UnknownNamespace,
    AccessDenied,
    LockDenied,
    ResourceDenied,
    RollbackFailed,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
    MalformedMessage,
}

/// Structured error-info payload, sufficient to render the `<error-info>`
/// element of a NETCONF `<rpc-error>`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorInfo {
    pub bad_element: Option<String>,
    pub missing_choice: Option<String>,
    pub namespace: Option<String>,
}

/// Enum listing possible errors from yangtree, shaped after the NETCONF
/// `<rpc-error>` structure so frontends can render it directly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pub etype: ErrorType,
    pub tag: ErrorTag,
    pub msg: Option<String>,
    pub path: Option<String>,
    pub apptag: Option<String>,
    pub info: ErrorInfo,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Transport => "transport",
            ErrorType::Rpc => "rpc",
            ErrorType::Protocol => "protocol",
            ErrorType::Application => "application",
        }
    }
}

impl ErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorTag::InUse => "in-use",
            ErrorTag::InvalidValue => "invalid-value",
            ErrorTag::TooBig => "too-big",
            ErrorTag::MissingAttribute => "missing-attribute",
            ErrorTag::BadAttribute => "bad-attribute",
            ErrorTag::UnknownAttribute => "unknown-attribute",
            ErrorTag::MissingElement => "missing-element",
            ErrorTag::BadElement => "bad-element",
            ErrorTag::UnknownElement => "unknown-element",
            ErrorTag::UnknownNamespace => "unknown-namespace",
            ErrorTag::AccessDenied => "access-denied",
            ErrorTag::LockDenied => "lock-denied",
            ErrorTag::ResourceDenied => "resource-denied",
            ErrorTag::RollbackFailed => "rollback-failed",
            ErrorTag::DataExists => "data-exists",
            ErrorTag::DataMissing => "data-missing",
            ErrorTag::OperationNotSupported => "operation-not-supported",
            ErrorTag::OperationFailed => "operation-failed",
            ErrorTag::MalformedMessage => "malformed-message",
        }
    }
}

impl Error {
    pub fn new(etype: ErrorType, tag: ErrorTag) -> Error {
        Error {
            etype,
            tag,
            ..Default::default()
        }
    }

    pub fn other(msg: &str) -> Error {
        Error {
            msg: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn missing_element(name: &str, msg: &str) -> Error {
        Error {
            tag: ErrorTag::MissingElement,
            msg: Some(msg.to_string()),
            info: ErrorInfo {
                bad_element: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub(crate) fn unknown_element(name: &str) -> Error {
        Error {
            tag: ErrorTag::UnknownElement,
            msg: Some(format!("Failed to find YANG spec of XML node: {}", name)),
            info: ErrorInfo {
                bad_element: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub(crate) fn unknown_namespace(uri: &str) -> Error {
        Error {
            tag: ErrorTag::UnknownNamespace,
            msg: Some(format!("No module corresponding to namespace {}", uri)),
            info: ErrorInfo {
                namespace: Some(uri.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub(crate) fn unknown_module(name: &str) -> Error {
        Error {
            tag: ErrorTag::UnknownElement,
            msg: Some(format!("No module found: {}", name)),
            info: ErrorInfo {
                bad_element: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub(crate) fn missing_choice(name: &str) -> Error {
        Error {
            tag: ErrorTag::DataMissing,
            apptag: Some("missing-choice".to_string()),
            info: ErrorInfo {
                missing_choice: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub(crate) fn invalid_value(path: &str, reason: &str) -> Error {
        Error {
            tag: ErrorTag::InvalidValue,
            msg: Some(reason.to_string()),
            path: Some(path.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn malformed_message(detail: &str) -> Error {
        Error {
            etype: ErrorType::Rpc,
            tag: ErrorTag::MalformedMessage,
            msg: Some(detail.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn invalid_identityref(value: &str) -> Error {
        Error {
            tag: ErrorTag::InvalidValue,
            apptag: Some("invalid-identityref".to_string()),
            msg: Some(format!("Invalid identityref value: {}", value)),
            ..Default::default()
        }
    }

    /// Render the error as a NETCONF `<rpc-error>` element. Severity is
    /// always `error`: the engine never produces warnings through this
    /// channel.
    pub fn to_rpc_error_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<rpc-error>");
        let _ = write!(out, "<error-type>{}</error-type>", self.etype.as_str());
        let _ = write!(out, "<error-tag>{}</error-tag>", self.tag.as_str());
        if let Some(apptag) = &self.apptag {
            let _ =
                write!(out, "<error-app-tag>{}</error-app-tag>", escape(apptag));
        }
        out.push_str("<error-severity>error</error-severity>");
        if let Some(path) = &self.path {
            let _ = write!(out, "<error-path>{}</error-path>", escape(path));
        }
        if let Some(msg) = &self.msg {
            let _ =
                write!(out, "<error-message>{}</error-message>", escape(msg));
        }
        if self.info != ErrorInfo::default() {
            out.push_str("<error-info>");
            if let Some(name) = &self.info.bad_element {
                let _ =
                    write!(out, "<bad-element>{}</bad-element>", escape(name));
            }
            if let Some(name) = &self.info.missing_choice {
                let _ = write!(
                    out,
                    "<missing-choice>{}</missing-choice>",
                    escape(name)
                );
            }
            if let Some(uri) = &self.info.namespace {
                let _ = write!(out, "<namespace>{}</namespace>", escape(uri));
            }
            out.push_str("</error-info>");
        }
        out.push_str("</rpc-error>");
        out
    }
}

fn escape(text: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(text)
}

impl Default for Error {
    fn default() -> Self {
        Self {
            etype: ErrorType::Application,
            tag: ErrorTag::OperationFailed,
            msg: None,
            path: None,
            apptag: None,
            info: ErrorInfo::default(),
        }
    }
}

impl std::fmt::Display for Error {
    // Print only the base error message by default.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{}", msg)
        } else {
            write!(f, "{}", self.tag.as_str())
        }
    }
}

impl std::error::Error for Error {}
