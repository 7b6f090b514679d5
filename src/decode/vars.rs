use std::collections::HashMap;

/// Callback consulted for variables that are not registered; returning
/// `None` leaves the `${NAME}` text in place.
pub type VariableHandler = Box<dyn FnMut(&str) -> Option<String>>;

/// Registry backing `${NAME}` expansion in string values.
#[derive(Default)]
pub(crate) struct Variables {
    map: HashMap<String, String>,
    handler: Option<VariableHandler>,
}

impl Variables {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    pub fn set_handler(&mut self, handler: VariableHandler) {
        self.handler = Some(handler);
    }

    fn resolve(&mut self, name: &str) -> Option<String> {
        if let Some(v) = self.map.get(name) {
            return Some(v.clone());
        }
        self.handler.as_mut().and_then(|h| h(name))
    }

    /// Expand every `${NAME}` occurrence. Returns `None` when no
    /// substitution was performed, so zero-copy callers can keep the
    /// original slice.
    pub fn expand(&mut self, input: &str) -> Option<String> {
        if !input.contains("${") {
            return None;
        }
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        let mut replaced = false;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match self.resolve(name) {
                        Some(value) => {
                            out.push_str(&value);
                            replaced = true;
                        }
                        None => {
                            out.push_str(&rest[start..start + 2 + close + 1]);
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        replaced.then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_expands_registered_variables() {
        let mut vars = Variables::default();
        vars.set("HOME", "/home/u");
        assert_eq!(
            vars.expand("path = ${HOME}/etc").as_deref(),
            Some("path = /home/u/etc")
        );
    }

    #[rstest::rstest]
    fn test_unknown_variable_stays_literal() {
        let mut vars = Variables::default();
        assert!(vars.expand("${MISSING} tail").is_none());
    }

    #[rstest::rstest]
    fn test_handler_fallback() {
        let mut vars = Variables::default();
        vars.set_handler(Box::new(|name| {
            (name == "ANSWER").then(|| "42".to_string())
        }));
        assert_eq!(vars.expand("x=${ANSWER}").as_deref(), Some("x=42"));
        assert!(vars.expand("x=${OTHER}").is_none());
    }

    #[rstest::rstest]
    fn test_no_marker_fast_path() {
        let mut vars = Variables::default();
        vars.set("A", "1");
        assert!(vars.expand("plain text").is_none());
        assert!(vars.expand("dollar $A only").is_none());
    }

    #[rstest::rstest]
    fn test_multiple_and_unterminated() {
        let mut vars = Variables::default();
        vars.set("A", "1");
        vars.set("B", "2");
        assert_eq!(vars.expand("${A}-${B}").as_deref(), Some("1-2"));
        assert!(vars.expand("${A").is_none());
    }
}
