//! Template rendering for cue bodies
//!
//! Syntax:
//! - `{{name}}` - replaced with the bound variable's value (empty if unbound)
//! - `{{date}}`, `{{time}}` - current wall-clock date / time
//! - `{{date:%d/%m/%Y}}` - date / time with an explicit format
//!
//! Formats support `%Y %m %d %H %M %S` and `%%`. Any other `%x` sequence is
//! emitted as-is.
//!
//! Rendering is a single left-to-right pass. Substituted text is never
//! scanned again, so a variable whose value contains `{{...}}` is inserted
//! literally.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use regex::{Captures, Regex};

use crate::state::{Variable, VariableType, VariableValue};

/// Fallback format for `{{date}}`
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Fallback format for `{{time}}`
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

/// `{{ ... }}` with the shortest possible body; `.` stops at newlines
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("Invalid regex"));

/// Resolved view of a variable for one render
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub kind: VariableType,
    pub default: VariableValue,
    /// Value substituted into the template; starts out as `default`
    pub value: VariableValue,
}

impl VariableBinding {
    pub fn from_variable(variable: &Variable) -> Self {
        Self {
            kind: variable.kind,
            default: variable.default.clone(),
            value: variable.default.clone(),
        }
    }

    /// Replace the value with a runtime override (e.g. user input)
    pub fn with_value(mut self, value: impl Into<VariableValue>) -> Self {
        self.value = value.into();
        self
    }
}

/// What a token name resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Variable(VariableBinding),
    Scalar(VariableValue),
}

impl Binding {
    fn value(&self) -> &VariableValue {
        match self {
            Binding::Variable(binding) => &binding.value,
            Binding::Scalar(value) => value,
        }
    }

    /// Stored format for `date` / `time` tokens
    fn stored_format(&self) -> Option<&str> {
        let stored = match self {
            Binding::Variable(binding) => &binding.default,
            Binding::Scalar(value) => value,
        };
        stored.as_str().filter(|s| !s.is_empty())
    }
}

impl From<VariableBinding> for Binding {
    fn from(binding: VariableBinding) -> Self {
        Binding::Variable(binding)
    }
}

impl From<VariableValue> for Binding {
    fn from(value: VariableValue) -> Self {
        Binding::Scalar(value)
    }
}

pub type Bindings = HashMap<String, Binding>;

/// Build bindings from variable definitions, applying runtime overrides by id
pub fn bindings_for(
    variables: &[Variable],
    overrides: &HashMap<String, VariableValue>,
) -> Bindings {
    variables
        .iter()
        .map(|variable| {
            let mut binding = VariableBinding::from_variable(variable);
            if let Some(value) = overrides.get(&variable.id) {
                binding = binding.with_value(value.clone());
            }
            (variable.id.clone(), Binding::Variable(binding))
        })
        .collect()
}

/// Render a template against the current local time
pub fn render(template: &str, bindings: &Bindings) -> String {
    render_at(template, bindings, Local::now().naive_local())
}

/// Render a template against an explicit clock
pub fn render_at(template: &str, bindings: &Bindings, now: NaiveDateTime) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures| {
            let body = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            render_token(body, bindings, now)
        })
        .into_owned()
}

fn render_token(body: &str, bindings: &Bindings, now: NaiveDateTime) -> String {
    let (name, param) = match body.split_once(':') {
        Some((name, param)) => (name.trim(), Some(param)),
        None => (body.trim(), None),
    };

    let fallback = match name {
        "date" => Some(DEFAULT_DATE_FORMAT),
        "time" => Some(DEFAULT_TIME_FORMAT),
        _ => None,
    };

    if let Some(fallback) = fallback {
        let format = param
            .filter(|p| !p.is_empty())
            .or_else(|| bindings.get(name).and_then(Binding::stored_format))
            .unwrap_or(fallback);
        return format_time(format, now);
    }

    bindings
        .get(name)
        .map(|binding| binding.value().to_string())
        .unwrap_or_default()
}

/// Format a timestamp with the supported strftime subset
pub fn format_time(format: &str, now: NaiveDateTime) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('Y') => out.push_str(&format!("{:04}", now.year())),
            Some('m') => out.push_str(&format!("{:02}", now.month())),
            Some('d') => out.push_str(&format!("{:02}", now.day())),
            Some('H') => out.push_str(&format!("{:02}", now.hour())),
            Some('M') => out.push_str(&format!("{:02}", now.minute())),
            Some('S') => out.push_str(&format!("{:02}", now.second())),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => {
                out.push('%');
                continue;
            }
        }
        chars.next();
    }

    out
}

/// Token names a template references, in order of first appearance
///
/// `date` and `time` are excluded since they never need user input.
pub fn template_inputs(template: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    TOKEN_RE
        .captures_iter(template)
        .filter_map(|cap| cap.get(1))
        .map(|m| {
            let body = m.as_str();
            body.split_once(':').map_or(body, |(name, _)| name).trim()
        })
        .filter(|name| !name.is_empty() && *name != "date" && *name != "time")
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 2)
            .unwrap()
    }

    fn scalar(name: &str, value: impl Into<VariableValue>) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert(name.to_string(), Binding::Scalar(value.into()));
        bindings
    }

    #[test]
    fn test_plain_text_unchanged() {
        let out = render_at("Best regards,\nJohn", &Bindings::new(), fixed_now());
        assert_eq!(out, "Best regards,\nJohn");
    }

    #[test]
    fn test_variable_substitution() {
        let variables = vec![Variable::new("name", VariableType::Text, "Ada")];
        let bindings = bindings_for(&variables, &HashMap::new());
        assert_eq!(
            render_at("Hi {{name}}!", &bindings, fixed_now()),
            "Hi Ada!"
        );
    }

    #[test]
    fn test_override_replaces_default() {
        let variables = vec![Variable::new("name", VariableType::Text, "Ada")];
        let mut overrides = HashMap::new();
        overrides.insert("name".to_string(), VariableValue::from("Grace"));
        let bindings = bindings_for(&variables, &overrides);
        assert_eq!(render_at("{{name}}", &bindings, fixed_now()), "Grace");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        assert_eq!(render_at("a{{missing}}b", &Bindings::new(), fixed_now()), "ab");
    }

    #[test]
    fn test_scalar_stringification() {
        assert_eq!(render_at("{{n}}", &scalar("n", 42_i64), fixed_now()), "42");
        assert_eq!(render_at("{{n}}", &scalar("n", 0.25_f64), fixed_now()), "0.25");
        assert_eq!(render_at("{{b}}", &scalar("b", true), fixed_now()), "true");
        assert_eq!(render_at("{{b}}", &scalar("b", false), fixed_now()), "false");
    }

    #[test]
    fn test_date_and_time_fallback_formats() {
        let out = render_at("{{date}} {{time}}", &Bindings::new(), fixed_now());
        assert_eq!(out, "2024-03-07 09:05");
    }

    #[test]
    fn test_date_with_param() {
        let out = render_at("{{date:%d/%m/%Y %H:%M:%S}}", &Bindings::new(), fixed_now());
        assert_eq!(out, "07/03/2024 09:05:02");
    }

    #[test]
    fn test_date_uses_stored_default_format() {
        let variables = vec![Variable::new("date", VariableType::Date, "%Y.%m")];
        let bindings = bindings_for(&variables, &HashMap::new());
        assert_eq!(render_at("{{date}}", &bindings, fixed_now()), "2024.03");
        // An explicit param still wins
        assert_eq!(render_at("{{date:%Y}}", &bindings, fixed_now()), "2024");
    }

    #[test]
    fn test_current_year() {
        let year = Local::now().year().to_string();
        let out = render("{{date:%Y}}", &Bindings::new());
        assert_eq!(out.len(), 4);
        assert_eq!(out, year);
    }

    #[test]
    fn test_unknown_format_sequences_pass_through() {
        assert_eq!(format_time("%Y %q 100%% %", fixed_now()), "2024 %q 100% %");
    }

    #[test]
    fn test_no_recursive_expansion() {
        let bindings = scalar("loop", "{{loop}}");
        assert_eq!(render_at("{{loop}}", &bindings, fixed_now()), "{{loop}}");
    }

    #[test]
    fn test_tokens_do_not_nest() {
        // Shortest body wins: "{{a" is the name, the trailing "}}" is literal
        let bindings = scalar("{{a", "X");
        assert_eq!(render_at("{{{{a}}}}", &bindings, fixed_now()), "X}}");
    }

    #[test]
    fn test_unclosed_token_is_literal() {
        assert_eq!(render_at("{{name", &Bindings::new(), fixed_now()), "{{name");
    }

    #[test]
    fn test_token_name_is_trimmed() {
        assert_eq!(render_at("{{ n }}", &scalar("n", "v"), fixed_now()), "v");
    }

    #[test]
    fn test_list_value_joined() {
        let list = VariableValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(render_at("{{l}}", &scalar("l", list), fixed_now()), "a,b");
    }

    #[test]
    fn test_template_inputs() {
        let inputs = template_inputs("{{name}} {{date:%Y}} {{ city }} {{name}} {{time}}");
        assert_eq!(inputs, vec!["name".to_string(), "city".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_templates_without_tokens_are_identity(t in "[^{}]*") {
            prop_assert_eq!(render(&t, &Bindings::new()), t);
        }

        #[test]
        fn prop_single_token_is_stringified_value(v in "[^{}]*") {
            let bindings = scalar("x", v.as_str());
            prop_assert_eq!(render_at("{{x}}", &bindings, fixed_now()), v);
        }
    }
}
