//! Option Vocabulary Module
//!
//! Provides the fixed set of named endpoint options, name matching, and the
//! value representation shared by get and set.
//!
//! ## Name matching
//!
//! Names may be written with or without a leading `-`. An exact name always
//! wins; otherwise the name must be a prefix of exactly one candidate. Unknown
//! and ambiguous names fail with [`CepError::BadOption`], whose message lists
//! every valid name for the operation.
//!
//! ## Values
//!
//! Values are written as whitespace separated lists. An element may be
//! wrapped in braces (`{}` is the empty element, `{a b}` is one element) or in
//! double quotes (`""` is also the empty element).

use std::fmt;

use crate::error::CepError;

/// A named endpoint option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    Broadcast,
    Domain,
    Error,
    Header,
    Hops,
    Join,
    Leave,
    Loop,
    Maddr,
    Mhops,
    Peereid,
    Peername,
    Protocol,
    ReceiveTimeout,
    Resolve,
    Route,
    SendTimeout,
    Shutdown,
    Sockname,
    Type,
}

impl OptionName {
    /// Options accepted by set, in error-message order
    pub const SETTABLE: &'static [OptionName] = &[
        OptionName::Broadcast,
        OptionName::Header,
        OptionName::Hops,
        OptionName::Join,
        OptionName::Leave,
        OptionName::Loop,
        OptionName::Maddr,
        OptionName::Mhops,
        OptionName::Peername,
        OptionName::ReceiveTimeout,
        OptionName::Resolve,
        OptionName::Route,
        OptionName::SendTimeout,
        OptionName::Shutdown,
    ];

    /// Options accepted by a single-name get, in error-message order
    pub const GETTABLE: &'static [OptionName] = &[
        OptionName::Broadcast,
        OptionName::Domain,
        OptionName::Error,
        OptionName::Header,
        OptionName::Hops,
        OptionName::Loop,
        OptionName::Maddr,
        OptionName::Mhops,
        OptionName::Peereid,
        OptionName::Peername,
        OptionName::Protocol,
        OptionName::ReceiveTimeout,
        OptionName::Resolve,
        OptionName::Route,
        OptionName::SendTimeout,
        OptionName::Shutdown,
        OptionName::Sockname,
        OptionName::Type,
    ];

    /// Options reported by get-all, in reporting order
    pub const GET_ALL: &'static [OptionName] = &[
        OptionName::Peername,
        OptionName::Sockname,
        OptionName::Hops,
        OptionName::Broadcast,
        OptionName::Domain,
        OptionName::Type,
        OptionName::Join,
        OptionName::Leave,
        OptionName::Shutdown,
        OptionName::Loop,
        OptionName::Mhops,
        OptionName::Maddr,
        OptionName::Protocol,
        OptionName::Resolve,
        OptionName::Header,
        OptionName::Route,
        OptionName::SendTimeout,
        OptionName::ReceiveTimeout,
        OptionName::Peereid,
    ];

    /// Canonical name, without the leading `-`
    pub fn name(&self) -> &'static str {
        match self {
            OptionName::Broadcast => "broadcast",
            OptionName::Domain => "domain",
            OptionName::Error => "error",
            OptionName::Header => "header",
            OptionName::Hops => "hops",
            OptionName::Join => "join",
            OptionName::Leave => "leave",
            OptionName::Loop => "loop",
            OptionName::Maddr => "maddr",
            OptionName::Mhops => "mhops",
            OptionName::Peereid => "peereid",
            OptionName::Peername => "peername",
            OptionName::Protocol => "protocol",
            OptionName::ReceiveTimeout => "receivetimeout",
            OptionName::Resolve => "resolve",
            OptionName::Route => "route",
            OptionName::SendTimeout => "sendtimeout",
            OptionName::Shutdown => "shutdown",
            OptionName::Sockname => "sockname",
            OptionName::Type => "type",
        }
    }

    /// Match a name for set
    pub fn lookup_settable(name: &str) -> Result<OptionName, CepError> {
        lookup(name, Self::SETTABLE)
    }

    /// Match a name for a single-name get
    pub fn lookup_gettable(name: &str) -> Result<OptionName, CepError> {
        lookup(name, Self::GETTABLE)
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn lookup(name: &str, candidates: &[OptionName]) -> Result<OptionName, CepError> {
    let bare = name.strip_prefix('-').unwrap_or(name);
    if !bare.is_empty() {
        if let Some(exact) = candidates.iter().find(|c| c.name() == bare) {
            return Ok(*exact);
        }
        let mut matches = candidates.iter().filter(|c| c.name().starts_with(bare));
        if let (Some(only), None) = (matches.next(), matches.next()) {
            return Ok(*only);
        }
    }
    Err(CepError::BadOption {
        name: name.to_string(),
        valid: candidates
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(" "),
    })
}

/// Value of an option as reported by get
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Reported as `1` or `0`
    Bool(bool),
    /// Decimal integer
    Int(i64),
    /// Single string element
    Text(String),
    /// List of string elements
    List(Vec<String>),
}

impl OptionValue {
    /// The `{{} {} -1}` value reported for an absent address
    pub fn no_address() -> Self {
        OptionValue::List(vec![String::new(), String::new(), "-1".to_string()])
    }

    /// Elements of the value as a list
    pub fn elements(&self) -> Vec<String> {
        match self {
            OptionValue::List(items) => items.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::List(items) => f.write_str(&join_list(items)),
        }
    }
}

/// Quote one element so that [`split_list`] yields it back unchanged
///
/// Elements with balanced braces and no backslashes are braced; anything else
/// is written bare with its special characters backslash-escaped.
pub fn quote_element(element: &str) -> String {
    if element.is_empty() {
        return "{}".to_string();
    }
    if !element.chars().any(needs_quoting) {
        return element.to_string();
    }
    if braces_balanced(element) && !element.contains('\\') {
        return format!("{{{}}}", element);
    }
    let mut escaped = String::with_capacity(element.len() * 2);
    for c in element.chars() {
        if needs_quoting(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn needs_quoting(c: char) -> bool {
    c.is_whitespace() || matches!(c, '{' | '}' | '"' | '\\')
}

fn braces_balanced(element: &str) -> bool {
    let mut depth = 0usize;
    for c in element.chars() {
        match c {
            '{' => depth += 1,
            '}' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

/// Join elements into a list string
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| quote_element(item.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a get-all result as a flat `-name value` list
pub fn format_option_list(values: &[(OptionName, OptionValue)]) -> String {
    let mut items = Vec::with_capacity(values.len() * 2);
    for (name, value) in values {
        items.push(format!("-{}", name.name()));
        items.push(value.to_string());
    }
    join_list(&items)
}

/// Split a list string into its elements
///
/// # Arguments
///
/// * `value` - Whitespace separated list, elements optionally braced or quoted
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The elements
/// * `Err(CepError::Protocol)` - Unmatched brace or quote
pub fn split_list(value: &str) -> Result<Vec<String>, CepError> {
    let mut items = Vec::new();
    let mut chars = value.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(first) = chars.next() else {
            return Ok(items);
        };
        let mut element = String::new();
        match first {
            '{' => {
                let mut depth = 1usize;
                loop {
                    match chars.next() {
                        Some('{') => {
                            depth += 1;
                            element.push('{');
                        }
                        Some('}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                            element.push('}');
                        }
                        Some(c) => element.push(c),
                        None => {
                            return Err(CepError::Protocol(
                                "unmatched open brace in list".to_string(),
                            ))
                        }
                    }
                }
            }
            '"' => loop {
                match chars.next() {
                    Some('"') => break,
                    Some(c) => element.push(c),
                    None => {
                        return Err(CepError::Protocol(
                            "unmatched open quote in list".to_string(),
                        ))
                    }
                }
            },
            c => {
                let mut next = Some(c);
                while let Some(c) = next {
                    if c == '\\' {
                        element.push(chars.next().unwrap_or('\\'));
                    } else {
                        element.push(c);
                    }
                    next = chars.next_if(|c| !c.is_whitespace());
                }
            }
        }
        if chars.peek().is_some_and(|c| !c.is_whitespace()) {
            return Err(CepError::Protocol(
                "list element in braces followed by extra characters".to_string(),
            ));
        }
        items.push(element);
    }
}

/// Parse a boolean option value
pub fn parse_bool(value: &str) -> Result<bool, CepError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => other.parse::<i64>().map(|n| n != 0).map_err(|_| {
            CepError::Protocol(format!("expected boolean value but got \"{}\"", value))
        }),
    }
}

/// Parse an integer option value
pub fn parse_int(value: &str) -> Result<i64, CepError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| CepError::Protocol(format!("expected integer but got \"{}\"", value)))
}
