use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;
use weaver_msgpack::{MsgPackError, Packer, Unpacker, ValueKind};

use super::{unpack_one, MessageCodec};
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::{Args, Dyn};
use crate::error::{Result, WeaverError};
use crate::registry::{WeakWeaver, Weaver};
use crate::surface::{Param, Surface};

struct Field {
    param: Param,
    codec: Arc<dyn MessageCodec>,
}

/// Records as a map keyed by field name.
///
/// On decode, a key matches the field with exactly that name, else the field
/// whose name is equal ignoring ASCII case, `_` and `-`. Field names that
/// collide once canonicalized only match exactly. A later duplicate key
/// overwrites an earlier one and unknown keys are skipped. A positional
/// array is accepted as well. Fields left unset take their
/// declared default, else the zero value of their type.
pub(crate) struct RecordCodec {
    surface: Surface,
    weaver: WeakWeaver,
    fields: Vec<Field>,
    exact: HashMap<String, usize>,
    /// `None` marks a canonical name shared by several fields.
    loose: HashMap<String, Option<usize>>,
}

pub(crate) fn canonical_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl RecordCodec {
    pub(crate) fn new(weaver: &Weaver, surface: &Surface) -> Result<Self> {
        let mut fields = Vec::with_capacity(surface.params().len());
        let mut exact = HashMap::with_capacity(surface.params().len());
        let mut loose = HashMap::with_capacity(surface.params().len());
        for (i, param) in surface.params().iter().enumerate() {
            let codec = weaver.resolve(&param.surface())?;
            exact.entry(param.name().to_string()).or_insert(i);
            loose
                .entry(canonical_name(param.name()))
                .and_modify(|slot| *slot = None)
                .or_insert(Some(i));
            fields.push(Field {
                param: param.clone(),
                codec,
            });
        }
        Ok(Self {
            surface: surface.clone(),
            weaver: weaver.downgrade(),
            fields,
            exact,
            loose,
        })
    }

    fn field_index(&self, key: &str) -> Option<usize> {
        if let Some(&i) = self.exact.get(key) {
            return Some(i);
        }
        self.loose.get(&canonical_name(key)).copied().flatten()
    }

    fn read_map(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext, slots: &mut [Option<Dyn>]) -> Result<()> {
        let len = u.unpack_map_header()?;
        for _ in 0..len {
            let field = match u.peek_kind()? {
                ValueKind::Str => {
                    let key = u.unpack_str()?;
                    let found = self.field_index(&key);
                    if found.is_none() {
                        trace!(surface = self.surface.name(), key = %key, "skipping unknown field");
                    }
                    found
                }
                _ => {
                    u.skip_value()?;
                    None
                }
            };
            match field {
                Some(i) => slots[i] = Some(unpack_one(self.fields[i].codec.as_ref(), u, ctx)?),
                None => u.skip_value()?,
            }
        }
        Ok(())
    }

    fn read_array(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext, slots: &mut [Option<Dyn>]) -> Result<()> {
        let len = u.unpack_array_header()?;
        for i in 0..len {
            match self.fields.get(i) {
                Some(field) => slots[i] = Some(unpack_one(field.codec.as_ref(), u, ctx)?),
                None => u.skip_value()?,
            }
        }
        Ok(())
    }

    fn missing(&self, field: &Field, config: &WeaverConfig) -> Result<Dyn> {
        let param = &field.param;
        if let Some(default) = param.default() {
            return Ok(default.clone());
        }
        if config.require_fields && param.is_required() {
            return Err(WeaverError::MissingField {
                name: self.surface.name().to_string(),
                field: param.name().to_string(),
            });
        }
        self.weaver.upgrade()?.zero_of(&param.surface())
    }
}

impl MessageCodec for RecordCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, config: &WeaverConfig) -> Result<()> {
        p.pack_map_header(self.fields.len())?;
        for field in &self.fields {
            p.pack_str(field.param.name())?;
            let part = field.param.get(value)?;
            field.codec.pack(&part, p, config)?;
        }
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let mut slots = vec![None; self.fields.len()];
        match u.peek_kind()? {
            ValueKind::Map => u.nested(|u| self.read_map(u, ctx, &mut slots))?,
            ValueKind::Array => u.nested(|u| self.read_array(u, ctx, &mut slots))?,
            ValueKind::Nil => u.unpack_nil()?,
            actual => {
                return Err(MsgPackError::TypeMismatch {
                    expected: ValueKind::Map,
                    actual,
                }
                .into())
            }
        }
        let config = *ctx.config();
        let args = slots
            .into_iter()
            .zip(&self.fields)
            .map(|(slot, field)| match slot {
                Some(value) => Ok(value),
                None => self.missing(field, &config),
            })
            .collect::<Result<Vec<_>>>()?;
        let record = self.surface.construct(Args(args))?;
        ctx.set_object(record);
        Ok(())
    }
}
