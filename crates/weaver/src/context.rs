use crate::config::WeaverConfig;
use crate::dynamic::Dyn;
use crate::surface::Data;

/// Result sink for one unpack call.
///
/// A codec reports what it decoded through one of the setters; the caller
/// collects it with [`WeaverContext::take`]. Nested codecs share the
/// context, so a container takes each element's result before decoding the
/// next one.
#[derive(Debug)]
pub struct WeaverContext {
    config: WeaverConfig,
    last: Dyn,
}

impl WeaverContext {
    pub fn new(config: WeaverConfig) -> Self {
        Self {
            config,
            last: Dyn::null(),
        }
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    pub fn set_null(&mut self) {
        self.last = Dyn::null();
    }

    pub fn set_bool(&mut self, b: bool) {
        self.last = Dyn::new(b);
    }

    pub fn set_i64(&mut self, int: i64) {
        self.last = Dyn::new(int);
    }

    pub fn set_f64(&mut self, float: f64) {
        self.last = Dyn::new(float);
    }

    pub fn set_str(&mut self, s: impl Into<String>) {
        self.last = Dyn::new(s.into());
    }

    pub fn set_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
        self.last = Dyn::new(bytes.into());
    }

    pub fn set_object<T: Data>(&mut self, value: T) {
        self.last = Dyn::new(value);
    }

    pub fn last(&self) -> &Dyn {
        &self.last
    }

    /// Takes the last result, leaving null behind.
    pub fn take(&mut self) -> Dyn {
        std::mem::take(&mut self.last)
    }
}
