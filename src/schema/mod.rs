//! JSON Schema draft-v4 validation over the document model.

use std::fmt;

use regex::Regex;

use crate::value::{ObjectMap, Value, ValueKind};

/// Combinator/reference recursion limit, matching include nesting.
const MAX_SCHEMA_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    TypeMismatch,
    InvalidSchema,
    MissingProperty,
    Constraint,
    MissingDependency,
    Unknown,
}

/// Validation failure: a code, a human message, and a clone of the
/// offending value.
#[derive(Debug, Clone)]
pub struct SchemaError {
    pub code: SchemaErrorCode,
    pub message: String,
    pub value: Value,
}

impl SchemaError {
    fn new(code: SchemaErrorCode, message: impl Into<String>, value: &Value) -> Self {
        Self {
            code,
            message: message.into(),
            value: value.clone(),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SchemaError {}

type SchemaResult = Result<(), SchemaError>;

/// Validate `value` against `schema` (itself a parsed value tree).
pub fn validate(schema: &Value, value: &Value) -> SchemaResult {
    validate_at(schema, value, schema, 0)
}

/// The draft-v4 name for a value's type.
fn schema_type_name(value: &Value) -> &'static str {
    match value.kind() {
        ValueKind::Int(_) => "integer",
        ValueKind::Float(_) | ValueKind::Time(_) => "number",
        ValueKind::Null | ValueKind::Userdata(_) => "null",
        ValueKind::Bool(_) => "boolean",
        ValueKind::String(_) => "string",
        ValueKind::Array(_) => "array",
        ValueKind::Object(_) => "object",
    }
}

fn type_matches(name: &str, value: &Value, schema_elt: &Value) -> Result<bool, SchemaError> {
    let ok = match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "integer" => matches!(value.kind(), ValueKind::Int(_)),
        // Ints and times are compatible with "number"
        "number" => matches!(
            value.kind(),
            ValueKind::Int(_) | ValueKind::Float(_) | ValueKind::Time(_)
        ),
        "string" => value.is_string(),
        "boolean" => matches!(value.kind(), ValueKind::Bool(_)),
        "null" => value.is_null(),
        _ => {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                format!("unknown type '{name}' in schema"),
                schema_elt,
            ))
        }
    };
    Ok(ok)
}

fn check_type(type_spec: &Value, value: &Value) -> SchemaResult {
    match type_spec.kind() {
        ValueKind::String(name) => {
            if type_matches(name.as_str(), value, type_spec)? {
                Ok(())
            } else {
                Err(SchemaError::new(
                    SchemaErrorCode::TypeMismatch,
                    format!(
                        "invalid type {}, expected {}",
                        schema_type_name(value),
                        name.as_str()
                    ),
                    value,
                ))
            }
        }
        ValueKind::Array(options) => {
            for option in options {
                if let Some(name) = option.as_str() {
                    if type_matches(name, value, option)? {
                        return Ok(());
                    }
                }
            }
            Err(SchemaError::new(
                SchemaErrorCode::TypeMismatch,
                format!("invalid type {}", schema_type_name(value)),
                value,
            ))
        }
        _ => Err(SchemaError::new(
            SchemaErrorCode::InvalidSchema,
            "type attribute is invalid in schema",
            type_spec,
        )),
    }
}

fn resolve_ref<'a>(root: &'a Value, reference: &str, at: &Value) -> Result<&'a Value, SchemaError> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(SchemaError::new(
            SchemaErrorCode::InvalidSchema,
            format!("only fragment references are supported: {reference}"),
            at,
        ));
    };
    let mut cur = root;
    for segment in fragment.split('/').filter(|s| !s.is_empty()) {
        cur = match cur.kind() {
            ValueKind::Object(map) => map.get(segment),
            ValueKind::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx)),
            _ => None,
        }
        .ok_or_else(|| {
            SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                format!("cannot resolve reference {reference}"),
                at,
            )
        })?;
    }
    Ok(cur)
}

fn validate_at(schema: &Value, value: &Value, root: &Value, depth: usize) -> SchemaResult {
    if depth > MAX_SCHEMA_DEPTH {
        return Err(SchemaError::new(
            SchemaErrorCode::Unknown,
            "schema recursion limit is reached",
            value,
        ));
    }
    let Some(smap) = schema.as_object() else {
        return Err(SchemaError::new(
            SchemaErrorCode::InvalidSchema,
            format!("schema is {} instead of object", schema.type_name()),
            schema,
        ));
    };

    if let Some(reference) = smap.get("$ref") {
        let Some(path) = reference.as_str() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "$ref attribute is invalid in schema",
                reference,
            ));
        };
        let target = resolve_ref(root, path, reference)?;
        return validate_at(target, value, root, depth + 1);
    }

    if let Some(type_spec) = smap.get("type") {
        check_type(type_spec, value)?;
    }

    if let Some(candidates) = smap.get("enum") {
        let Some(options) = candidates.as_array() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "enum attribute is invalid in schema",
                candidates,
            ));
        };
        if !options.iter().any(|option| option == value) {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                "value is not one of the enumerated candidates",
                value,
            ));
        }
    }

    validate_combinators(smap, value, root, depth)?;

    match value.kind() {
        ValueKind::Object(map) => validate_object(smap, map, value, root, depth),
        ValueKind::Array(items) => validate_array(smap, items, value, root, depth),
        ValueKind::Int(_) | ValueKind::Float(_) | ValueKind::Time(_) => {
            validate_number(smap, value)
        }
        ValueKind::String(_) => validate_string(smap, value),
        _ => Ok(()),
    }
}

fn validate_combinators(
    smap: &ObjectMap,
    value: &Value,
    root: &Value,
    depth: usize,
) -> SchemaResult {
    if let Some(all) = smap.get("allOf") {
        let Some(schemas) = all.as_array() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "allOf attribute is invalid in schema",
                all,
            ));
        };
        for sub in schemas {
            validate_at(sub, value, root, depth + 1)?;
        }
    }

    if let Some(any) = smap.get("anyOf") {
        let Some(schemas) = any.as_array() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "anyOf attribute is invalid in schema",
                any,
            ));
        };
        // Errors from failed branches are discarded when one passes.
        let passed = schemas
            .iter()
            .any(|sub| validate_at(sub, value, root, depth + 1).is_ok());
        if !passed {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                "value matches no anyOf variant",
                value,
            ));
        }
    }

    if let Some(one) = smap.get("oneOf") {
        let Some(schemas) = one.as_array() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "oneOf attribute is invalid in schema",
                one,
            ));
        };
        let passed = schemas
            .iter()
            .filter(|sub| validate_at(sub, value, root, depth + 1).is_ok())
            .count();
        if passed != 1 {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("value matches {passed} oneOf variants instead of exactly one"),
                value,
            ));
        }
    }

    if let Some(not) = smap.get("not") {
        if validate_at(not, value, root, depth + 1).is_ok() {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                "value matches a schema it must not match",
                value,
            ));
        }
    }

    Ok(())
}

fn validate_object(
    smap: &ObjectMap,
    obj: &ObjectMap,
    value: &Value,
    root: &Value,
    depth: usize,
) -> SchemaResult {
    let properties = smap.get("properties").and_then(Value::as_object);
    if let Some(props) = properties {
        for (key, sub) in props.iter() {
            if let Some(found) = obj.get_all(key) {
                for item in found {
                    validate_at(sub, item, root, depth)?;
                }
            }
        }
    }

    let mut pattern_schemas: Vec<(Regex, &Value)> = Vec::new();
    if let Some(patterns) = smap.get("patternProperties") {
        let Some(patterns) = patterns.as_object() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "patternProperties attribute is invalid in schema",
                patterns,
            ));
        };
        for (pattern, sub) in patterns.iter() {
            let regex = Regex::new(pattern).map_err(|_| {
                SchemaError::new(
                    SchemaErrorCode::InvalidSchema,
                    format!("invalid pattern in schema: {pattern}"),
                    sub,
                )
            })?;
            for (key, item) in obj.iter_expanded() {
                if regex.is_match(key) {
                    validate_at(sub, item, root, depth)?;
                }
            }
            pattern_schemas.push((regex, sub));
        }
    }

    if let Some(additional) = smap.get("additionalProperties") {
        let is_known = |key: &str| {
            properties.is_some_and(|props| props.contains_key(key))
                || pattern_schemas.iter().any(|(re, _)| re.is_match(key))
        };
        match additional.kind() {
            ValueKind::Bool(true) => {}
            ValueKind::Bool(false) => {
                for (key, _) in obj.iter() {
                    if !is_known(key) {
                        return Err(SchemaError::new(
                            SchemaErrorCode::Constraint,
                            format!("object has undefined property {key}"),
                            value,
                        ));
                    }
                }
            }
            ValueKind::Object(_) => {
                for (key, item) in obj.iter_expanded() {
                    if !is_known(key) {
                        validate_at(additional, item, root, depth)?;
                    }
                }
            }
            _ => {
                return Err(SchemaError::new(
                    SchemaErrorCode::InvalidSchema,
                    "additionalProperties attribute is invalid in schema",
                    additional,
                ))
            }
        }
    }

    if let Some(required) = smap.get("required") {
        let Some(names) = required.as_array() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "required attribute is invalid in schema",
                required,
            ));
        };
        for name in names {
            let Some(name) = name.as_str() else { continue };
            if !obj.contains_key(name) {
                return Err(SchemaError::new(
                    SchemaErrorCode::MissingProperty,
                    format!("object has missing property {name}"),
                    value,
                ));
            }
        }
    }

    if let Some(min) = smap.get("minProperties").and_then(Value::as_i64) {
        if (obj.len() as i64) < min {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!(
                    "object has not enough properties: {}, minimum is: {min}",
                    obj.len()
                ),
                value,
            ));
        }
    }
    if let Some(max) = smap.get("maxProperties").and_then(Value::as_i64) {
        if (obj.len() as i64) > max {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!(
                    "object has too many properties: {}, maximum is: {max}",
                    obj.len()
                ),
                value,
            ));
        }
    }

    if let Some(dependencies) = smap.get("dependencies") {
        let Some(deps) = dependencies.as_object() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "dependencies attribute is invalid in schema",
                dependencies,
            ));
        };
        for (key, dep) in deps.iter() {
            if !obj.contains_key(key) {
                continue;
            }
            match dep.kind() {
                ValueKind::Array(names) => {
                    for name in names {
                        let Some(name) = name.as_str() else { continue };
                        if !obj.contains_key(name) {
                            return Err(SchemaError::new(
                                SchemaErrorCode::MissingDependency,
                                format!("property {key} depends on missing property {name}"),
                                value,
                            ));
                        }
                    }
                }
                ValueKind::Object(_) => validate_at(dep, value, root, depth + 1)?,
                _ => {
                    return Err(SchemaError::new(
                        SchemaErrorCode::InvalidSchema,
                        "dependencies attribute is invalid in schema",
                        dep,
                    ))
                }
            }
        }
    }

    Ok(())
}

fn validate_array(
    smap: &ObjectMap,
    items: &[Value],
    value: &Value,
    root: &Value,
    depth: usize,
) -> SchemaResult {
    let mut first_unvalidated = items.len();
    if let Some(item_spec) = smap.get("items") {
        match item_spec.kind() {
            ValueKind::Object(_) => {
                for item in items {
                    validate_at(item_spec, item, root, depth)?;
                }
                first_unvalidated = items.len();
            }
            ValueKind::Array(schemas) => {
                for (schema, item) in schemas.iter().zip(items) {
                    validate_at(schema, item, root, depth)?;
                }
                first_unvalidated = schemas.len().min(items.len());
            }
            _ => {
                return Err(SchemaError::new(
                    SchemaErrorCode::InvalidSchema,
                    "items attribute is invalid in schema",
                    item_spec,
                ))
            }
        }
    }

    if let Some(additional) = smap.get("additionalItems") {
        match additional.kind() {
            ValueKind::Bool(true) => {}
            ValueKind::Bool(false) => {
                if first_unvalidated < items.len() {
                    return Err(SchemaError::new(
                        SchemaErrorCode::Constraint,
                        format!("array has undefined item at position {first_unvalidated}"),
                        value,
                    ));
                }
            }
            ValueKind::Object(_) => {
                for item in &items[first_unvalidated..] {
                    validate_at(additional, item, root, depth)?;
                }
            }
            _ => {
                return Err(SchemaError::new(
                    SchemaErrorCode::InvalidSchema,
                    "additionalItems attribute is invalid in schema",
                    additional,
                ))
            }
        }
    }

    if smap.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
        for (i, a) in items.iter().enumerate() {
            if items[..i].iter().any(|b| a == b) {
                return Err(SchemaError::new(
                    SchemaErrorCode::Constraint,
                    "duplicate values detected while uniqueItems is true",
                    a,
                ));
            }
        }
    }

    if let Some(min) = smap.get("minItems").and_then(Value::as_i64) {
        if (items.len() as i64) < min {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("array has not enough items: {}, minimum is: {min}", items.len()),
                value,
            ));
        }
    }
    if let Some(max) = smap.get("maxItems").and_then(Value::as_i64) {
        if (items.len() as i64) > max {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("array has too many items: {}, maximum is: {max}", items.len()),
                value,
            ));
        }
    }

    Ok(())
}

fn validate_number(smap: &ObjectMap, value: &Value) -> SchemaResult {
    let val = value.as_f64().expect("numeric tag carries a number");

    if let Some(multiple) = smap.get("multipleOf") {
        let Some(step) = multiple.as_f64() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "multipleOf attribute is invalid in schema",
                multiple,
            ));
        };
        if step <= 0.0 {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "multipleOf must be greater than zero",
                multiple,
            ));
        }
        let rem = (val % step).abs();
        if rem >= 1e-16 && (step - rem).abs() >= 1e-16 {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("number {val} is not a multiple of {step}"),
                value,
            ));
        }
    }

    if let Some(maximum) = smap.get("maximum").and_then(Value::as_f64) {
        let exclusive = smap.get("exclusiveMaximum").and_then(Value::as_bool) == Some(true);
        if val > maximum || (exclusive && val >= maximum) {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("number is too big: {val:.3}, maximum is: {maximum:.3}"),
                value,
            ));
        }
    }

    if let Some(minimum) = smap.get("minimum").and_then(Value::as_f64) {
        let exclusive = smap.get("exclusiveMinimum").and_then(Value::as_bool) == Some(true);
        if val < minimum || (exclusive && val <= minimum) {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("number is too small: {val:.3}, minimum is: {minimum:.3}"),
                value,
            ));
        }
    }

    Ok(())
}

fn validate_string(smap: &ObjectMap, value: &Value) -> SchemaResult {
    let s = value.as_str().expect("string tag carries a string");
    let chars = s.chars().count() as i64;

    if let Some(max) = smap.get("maxLength").and_then(Value::as_i64) {
        if chars > max {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("string is too long: {chars}, maximum is: {max}"),
                value,
            ));
        }
    }
    if let Some(min) = smap.get("minLength").and_then(Value::as_i64) {
        if chars < min {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("string is too short: {chars}, minimum is: {min}"),
                value,
            ));
        }
    }
    if let Some(pattern_spec) = smap.get("pattern") {
        let Some(pattern) = pattern_spec.as_str() else {
            return Err(SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                "pattern attribute is invalid in schema",
                pattern_spec,
            ));
        };
        let regex = Regex::new(pattern).map_err(|_| {
            SchemaError::new(
                SchemaErrorCode::InvalidSchema,
                format!("invalid pattern in schema: {pattern}"),
                pattern_spec,
            )
        })?;
        if !regex.is_match(s) {
            return Err(SchemaError::new(
                SchemaErrorCode::Constraint,
                format!("string does not match pattern {pattern}"),
                value,
            ));
        }
    }

    Ok(())
}
