//! The bidirectional conversion surface.
//!
//! `ValueBridge` owns the pre-registered object templates for specialized
//! records (so script-side `instanceof` works) and the reusable scratch
//! buffer backing script→native string conversion.

use crate::enums::{enum_to_script, ScriptEnum};
use core_types::{
    Color, FileEntry, HandleTag, HttpResponse, ImageInfo, PathInfo, RuntimeError, ScriptValue,
    WeakId,
};
use handle_table::WeakHandles;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use script_engine::{Engine, TemplateId};

/// Largest integer exactly representable in a script number.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Property carrying the slot id inside a weak-handle wrapper object.
const HANDLE_SLOT_KEY: &str = "$handle";

/// Bidirectional converter between native typed values and script values.
pub struct ValueBridge {
    scratch: String,
    http_response: TemplateId,
    image_info: TemplateId,
    color: TemplateId,
    path_info: TemplateId,
    file_entry: TemplateId,
}

impl ValueBridge {
    /// Registers the record templates and returns the bridge.
    pub fn new(engine: &mut dyn Engine) -> Self {
        Self {
            scratch: String::new(),
            http_response: engine.register_template("HttpResponse"),
            image_info: engine.register_template("ImageInfo"),
            color: engine.register_template("Color"),
            path_info: engine.register_template("PathInfo"),
            file_entry: engine.register_template("FileEntry"),
        }
    }

    // --- native → script --------------------------------------------------

    /// `i16` → number.
    pub fn from_i16(&self, value: i16) -> ScriptValue {
        ScriptValue::Int(value as i32)
    }

    /// `u8` → number.
    pub fn from_u8(&self, value: u8) -> ScriptValue {
        ScriptValue::Int(value as i32)
    }

    /// `u32` → number (promoted to double beyond the smi range).
    pub fn from_u32(&self, value: u32) -> ScriptValue {
        if value <= i32::MAX as u32 {
            ScriptValue::Int(value as i32)
        } else {
            ScriptValue::Number(value as f64)
        }
    }

    /// Safe-range unsigned integer → number; out of range is an error.
    pub fn from_safe_uint(&self, value: u64) -> Result<ScriptValue, RuntimeError> {
        if value > MAX_SAFE_INTEGER {
            return Err(RuntimeError::OutOfBounds);
        }
        Ok(if value <= i32::MAX as u64 {
            ScriptValue::Int(value as i32)
        } else {
            ScriptValue::Number(value as f64)
        })
    }

    /// `u64` → bigint, lossless for the full range.
    pub fn from_u64(&self, value: u64) -> ScriptValue {
        ScriptValue::BigInt(BigInt::from(value))
    }

    /// `f32` → number.
    pub fn from_f32(&self, value: f32) -> ScriptValue {
        ScriptValue::Number(value as f64)
    }

    /// `bool` → boolean.
    pub fn from_bool(&self, value: bool) -> ScriptValue {
        ScriptValue::Boolean(value)
    }

    /// UTF-8 text → string.
    pub fn from_str(&self, value: &str) -> ScriptValue {
        ScriptValue::String(value.to_string())
    }

    /// Raw bytes → typed byte array over an engine-heap backing store.
    pub fn from_bytes(&self, engine: &mut dyn Engine, bytes: &[u8]) -> ScriptValue {
        engine.new_byte_array(bytes)
    }

    /// `None` → `null`; `Some(v)` converts through `f`.
    pub fn from_option<T>(
        &self,
        engine: &mut dyn Engine,
        value: Option<T>,
        f: impl FnOnce(&Self, &mut dyn Engine, T) -> ScriptValue,
    ) -> ScriptValue {
        match value {
            Some(v) => f(self, engine, v),
            None => ScriptValue::Null,
        }
    }

    /// Error value → error object carrying `message` and numeric `code`.
    pub fn from_error(&self, engine: &mut dyn Engine, error: &RuntimeError) -> ScriptValue {
        let object = engine.new_error(&error.to_string());
        engine.set_property(&object, "code", ScriptValue::Int(error.code()));
        object
    }

    /// Enum → name (string-sum) or index.
    pub fn from_enum<E: ScriptEnum>(&self, value: E) -> ScriptValue {
        enum_to_script(value)
    }

    /// Opaque script value passed through unchanged.
    pub fn passthrough(&self, value: ScriptValue) -> ScriptValue {
        value
    }

    /// Generic record: fields converted one by one into a plain object.
    pub fn from_fields(
        &self,
        engine: &mut dyn Engine,
        fields: Vec<(&str, ScriptValue)>,
    ) -> ScriptValue {
        let object = engine.new_object();
        for (key, value) in fields {
            engine.set_property(&object, key, value);
        }
        object
    }

    /// HTTP response → `HttpResponse` instance.
    pub fn from_http_response(
        &self,
        engine: &mut dyn Engine,
        response: &HttpResponse,
    ) -> ScriptValue {
        let object = engine.new_instance(self.http_response);
        engine.set_property(&object, "status", ScriptValue::Int(response.status as i32));
        let headers = engine.new_object();
        for (name, value) in &response.headers {
            engine.set_property(&headers, name, ScriptValue::String(value.clone()));
        }
        engine.set_property(&object, "headers", headers);
        let body = engine.new_byte_array(&response.body);
        engine.set_property(&object, "body", body);
        object
    }

    /// Image descriptor → `ImageInfo` instance.
    pub fn from_image_info(&self, engine: &mut dyn Engine, info: &ImageInfo) -> ScriptValue {
        let object = engine.new_instance(self.image_info);
        engine.set_property(&object, "width", self.from_u32(info.width));
        engine.set_property(&object, "height", self.from_u32(info.height));
        engine.set_property(&object, "channels", self.from_u8(info.channels));
        object
    }

    /// Color → `Color` instance.
    pub fn from_color(&self, engine: &mut dyn Engine, color: &Color) -> ScriptValue {
        let object = engine.new_instance(self.color);
        engine.set_property(&object, "r", self.from_u8(color.r));
        engine.set_property(&object, "g", self.from_u8(color.g));
        engine.set_property(&object, "b", self.from_u8(color.b));
        engine.set_property(&object, "a", self.from_u8(color.a));
        object
    }

    /// Path metadata → `PathInfo` instance.
    pub fn from_path_info(&self, engine: &mut dyn Engine, info: &PathInfo) -> ScriptValue {
        let object = engine.new_instance(self.path_info);
        engine.set_property(&object, "path", self.from_str(&info.path));
        engine.set_property(&object, "exists", ScriptValue::Boolean(info.exists));
        engine.set_property(&object, "isDir", ScriptValue::Boolean(info.is_dir));
        object
    }

    /// Directory entry → `FileEntry` instance.
    pub fn from_file_entry(&self, engine: &mut dyn Engine, entry: &FileEntry) -> ScriptValue {
        let object = engine.new_instance(self.file_entry);
        engine.set_property(&object, "name", self.from_str(&entry.name));
        engine.set_property(&object, "isDir", ScriptValue::Boolean(entry.is_dir));
        engine.set_property(&object, "size", ScriptValue::Number(entry.size as f64));
        object
    }

    /// Directory listing → array of `FileEntry` instances.
    pub fn from_file_entries(
        &self,
        engine: &mut dyn Engine,
        entries: &[FileEntry],
    ) -> ScriptValue {
        let items = entries
            .iter()
            .map(|entry| self.from_file_entry(engine, entry))
            .collect();
        engine.new_array(items)
    }

    /// Weak-handle wrapper object for a slot.
    pub fn from_weak(
        &self,
        engine: &mut dyn Engine,
        class_name: &str,
        id: WeakId,
    ) -> ScriptValue {
        let template = engine.register_template(class_name);
        let object = engine.new_instance(template);
        engine.set_property(&object, HANDLE_SLOT_KEY, ScriptValue::Int(id as i32));
        object
    }

    // --- script → native --------------------------------------------------

    /// Number → `i16`, range checked.
    pub fn to_i16(&self, value: &ScriptValue) -> Result<i16, RuntimeError> {
        let n = self.to_i64(value)?;
        i16::try_from(n).map_err(|_| RuntimeError::OutOfBounds)
    }

    /// Number → `u8`, range checked.
    pub fn to_u8(&self, value: &ScriptValue) -> Result<u8, RuntimeError> {
        let n = self.to_i64(value)?;
        u8::try_from(n).map_err(|_| RuntimeError::OutOfBounds)
    }

    /// Number → `u32`, range checked.
    pub fn to_u32(&self, value: &ScriptValue) -> Result<u32, RuntimeError> {
        let n = self.to_i64(value)?;
        u32::try_from(n).map_err(|_| RuntimeError::OutOfBounds)
    }

    /// Number or bigint → `u64`, range checked.
    pub fn to_u64(&self, value: &ScriptValue) -> Result<u64, RuntimeError> {
        match value {
            ScriptValue::BigInt(n) => n.to_u64().ok_or(RuntimeError::OutOfBounds),
            _ => {
                let n = self.to_i64(value)?;
                u64::try_from(n).map_err(|_| RuntimeError::OutOfBounds)
            }
        }
    }

    /// Number → `f32`.
    pub fn to_f32(&self, value: &ScriptValue) -> Result<f32, RuntimeError> {
        match value {
            ScriptValue::Int(n) => Ok(*n as f32),
            ScriptValue::Number(n) => Ok(*n as f32),
            other => Err(cant_convert("number", other)),
        }
    }

    /// Boolean → `bool`.
    pub fn to_bool(&self, value: &ScriptValue) -> Result<bool, RuntimeError> {
        match value {
            ScriptValue::Boolean(b) => Ok(*b),
            other => Err(cant_convert("boolean", other)),
        }
    }

    /// String → borrowed UTF-8.
    ///
    /// The returned slice lives in the bridge's reusable scratch buffer and
    /// is valid only until the next bridge call that takes `&mut self`.
    pub fn to_str(&mut self, value: &ScriptValue) -> Result<&str, RuntimeError> {
        match value {
            ScriptValue::String(s) => {
                self.scratch.clear();
                self.scratch.push_str(s);
                Ok(self.scratch.as_str())
            }
            other => Err(cant_convert("string", other)),
        }
    }

    /// Typed byte array → owned bytes.
    pub fn to_bytes(
        &self,
        engine: &dyn Engine,
        value: &ScriptValue,
    ) -> Result<Vec<u8>, RuntimeError> {
        engine
            .byte_array(value)
            .map(|b| b.to_vec())
            .ok_or_else(|| cant_convert("byte array", value))
    }

    /// Array → element values.
    pub fn to_values(
        &self,
        engine: &dyn Engine,
        value: &ScriptValue,
    ) -> Result<Vec<ScriptValue>, RuntimeError> {
        engine
            .array_items(value)
            .ok_or_else(|| cant_convert("array", value))
    }

    /// Object → `Color`.
    ///
    /// Every field is optional; missing fields take the record's defaults.
    pub fn to_color(
        &self,
        engine: &dyn Engine,
        value: &ScriptValue,
    ) -> Result<Color, RuntimeError> {
        if !matches!(value, ScriptValue::Object(_)) {
            return Err(cant_convert("Color", value));
        }
        let defaults = Color::default();
        Ok(Color {
            r: self.optional_field(engine, value, "r", defaults.r, |v| self.to_u8(v))?,
            g: self.optional_field(engine, value, "g", defaults.g, |v| self.to_u8(v))?,
            b: self.optional_field(engine, value, "b", defaults.b, |v| self.to_u8(v))?,
            a: self.optional_field(engine, value, "a", defaults.a, |v| self.to_u8(v))?,
        })
    }

    /// Object → `ImageInfo`. Every field is required.
    pub fn to_image_info(
        &self,
        engine: &dyn Engine,
        value: &ScriptValue,
    ) -> Result<ImageInfo, RuntimeError> {
        Ok(ImageInfo {
            width: self.to_u32(&self.required_field(engine, value, "width")?)?,
            height: self.to_u32(&self.required_field(engine, value, "height")?)?,
            channels: self.to_u8(&self.required_field(engine, value, "channels")?)?,
        })
    }

    /// Object → `PathInfo`. Every field is required.
    pub fn to_path_info(
        &self,
        engine: &dyn Engine,
        value: &ScriptValue,
    ) -> Result<PathInfo, RuntimeError> {
        let path = match self.required_field(engine, value, "path")? {
            ScriptValue::String(s) => s,
            other => return Err(cant_convert("string", &other)),
        };
        Ok(PathInfo {
            path,
            exists: self.to_bool(&self.required_field(engine, value, "exists")?)?,
            is_dir: self.to_bool(&self.required_field(engine, value, "isDir")?)?,
        })
    }

    /// Object → `FileEntry`. Every field is required.
    pub fn to_file_entry(
        &self,
        engine: &dyn Engine,
        value: &ScriptValue,
    ) -> Result<FileEntry, RuntimeError> {
        let name = match self.required_field(engine, value, "name")? {
            ScriptValue::String(s) => s,
            other => return Err(cant_convert("string", &other)),
        };
        let size = match self.required_field(engine, value, "size")? {
            ScriptValue::Number(n) if n >= 0.0 && n.fract() == 0.0 => n as u64,
            ScriptValue::Int(n) if n >= 0 => n as u64,
            other => return Err(cant_convert("size", &other)),
        };
        Ok(FileEntry {
            name,
            is_dir: self.to_bool(&self.required_field(engine, value, "isDir")?)?,
            size,
        })
    }

    /// Object → `HttpResponse`. Headers come back in property order.
    pub fn to_http_response(
        &self,
        engine: &dyn Engine,
        value: &ScriptValue,
    ) -> Result<HttpResponse, RuntimeError> {
        let status_value = self.required_field(engine, value, "status")?;
        let status =
            u16::try_from(self.to_u32(&status_value)?).map_err(|_| RuntimeError::OutOfBounds)?;
        let headers_obj = self.required_field(engine, value, "headers")?;
        let mut headers = Vec::new();
        for name in engine.property_names(&headers_obj) {
            match engine.get_property(&headers_obj, &name) {
                Some(ScriptValue::String(v)) => headers.push((name, v)),
                Some(other) => return Err(cant_convert("header value", &other)),
                None => {}
            }
        }
        let body = self.to_bytes(engine, &self.required_field(engine, value, "body")?)?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// Weak-handle wrapper → validated slot id.
    ///
    /// Returns `HandleExpired` when the slot was explicitly deinited.
    pub fn to_weak(
        &self,
        engine: &dyn Engine,
        table: &WeakHandles,
        value: &ScriptValue,
        expected: HandleTag,
    ) -> Result<WeakId, RuntimeError> {
        let slot = engine
            .get_property(value, HANDLE_SLOT_KEY)
            .ok_or_else(|| cant_convert("handle", value))?;
        let id = match slot {
            ScriptValue::Int(n) if n >= 0 => n as WeakId,
            _ => return Err(cant_convert("handle", value)),
        };
        table.lookup(id, expected)?;
        Ok(id)
    }

    /// Enum from name or index, honoring the declared fallback.
    pub fn to_enum<E: ScriptEnum>(&self, value: &ScriptValue) -> Result<E, RuntimeError> {
        crate::enums::enum_from_script(value)
    }

    // --- helpers ----------------------------------------------------------

    fn to_i64(&self, value: &ScriptValue) -> Result<i64, RuntimeError> {
        match value {
            ScriptValue::Int(n) => Ok(*n as i64),
            ScriptValue::Number(n) => {
                if n.fract() != 0.0 || n.is_nan() || n.is_infinite() {
                    Err(RuntimeError::CantConvert(format!(
                        "integer expected, found {}",
                        n
                    )))
                } else {
                    Ok(*n as i64)
                }
            }
            other => Err(cant_convert("number", other)),
        }
    }

    fn optional_field<T>(
        &self,
        engine: &dyn Engine,
        object: &ScriptValue,
        key: &str,
        default: T,
        convert: impl FnOnce(&ScriptValue) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        match engine.get_property(object, key) {
            None | Some(ScriptValue::Undefined) | Some(ScriptValue::Null) => Ok(default),
            Some(value) => convert(&value),
        }
    }

    fn required_field(
        &self,
        engine: &dyn Engine,
        object: &ScriptValue,
        key: &str,
    ) -> Result<ScriptValue, RuntimeError> {
        engine
            .get_property(object, key)
            .ok_or_else(|| RuntimeError::CantConvert(format!("missing field `{}`", key)))
    }
}

fn cant_convert(expected: &str, found: &ScriptValue) -> RuntimeError {
    RuntimeError::CantConvert(format!("{} expected, found {}", expected, found.type_of()))
}
