use weaver_msgpack::json::JsonOptions;

/// Options threaded through every pack, unpack and JSON call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaverConfig {
    /// Reject invalid UTF-8 in strings instead of replacing it.
    pub strict_utf8: bool,
    /// Fail when a required record field without a default is missing,
    /// instead of filling in its zero value.
    pub require_fields: bool,
    pub json: JsonOptions,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            strict_utf8: true,
            require_fields: false,
            json: JsonOptions::default(),
        }
    }
}

impl WeaverConfig {
    pub fn with_strict_utf8(mut self, strict: bool) -> Self {
        self.strict_utf8 = strict;
        self
    }

    pub fn with_require_fields(mut self, require: bool) -> Self {
        self.require_fields = require;
        self
    }

    pub fn with_json(mut self, json: JsonOptions) -> Self {
        self.json = json;
        self
    }
}
