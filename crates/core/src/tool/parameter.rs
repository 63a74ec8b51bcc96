use std::fmt::{self, Display};

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};

/// A coarse type hint shown to the model.
///
/// Tags are never enforced when a tool is invoked; binding is left to the
/// tool's input type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// Text.
    String,
    /// A whole number.
    Integer,
    /// A number that may have a fraction.
    Float,
    /// `true` or `false`.
    Boolean,
    /// An ordered sequence.
    List,
    /// A key/value mapping.
    Dict,
    /// A callable.
    Function,
    /// Anything else.
    Unknown,
}

impl TypeTag {
    /// Maps a JSON schema primitive type name to a tag.
    ///
    /// Only the primitive kinds are recognized, everything else is
    /// [`TypeTag::Unknown`].
    pub fn from_schema_type(name: &str) -> Self {
        match name {
            "string" => TypeTag::String,
            "integer" => TypeTag::Integer,
            "number" => TypeTag::Float,
            "boolean" => TypeTag::Boolean,
            "array" => TypeTag::List,
            "object" => TypeTag::Dict,
            _ => TypeTag::Unknown,
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
            TypeTag::List => "list",
            TypeTag::Dict => "dict",
            TypeTag::Function => "function",
            TypeTag::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A declared tool parameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    #[serde(rename = "type")]
    type_tag: TypeTag,
    has_default: bool,
    default: Value,
}

impl Parameter {
    /// Creates a required parameter.
    #[inline]
    pub fn new<S: Into<String>>(name: S, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            has_default: false,
            default: Value::Null,
        }
    }

    /// Marks the parameter optional, with `default` used when it is omitted.
    #[inline]
    pub fn with_default<V: Into<Value>>(self, default: V) -> Self {
        Self {
            has_default: true,
            default: default.into(),
            ..self
        }
    }

    /// Returns the parameter name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type hint.
    #[inline]
    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Returns `true` if the parameter may be omitted.
    #[inline]
    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Returns the value used when the parameter is omitted.
    #[inline]
    pub fn default_value(&self) -> &Value {
        &self.default
    }
}

/// Input type for tools that take no arguments.
#[derive(Clone, Copy, Debug, Default, serde::Deserialize, JsonSchema)]
pub struct NoParameters {}

/// Derives the parameter list of an input type from its JSON schema.
///
/// Properties keep their declaration order. A property that is not
/// `required` gets a default, taken from the schema or `null`.
pub fn parameters_of<T: JsonSchema>() -> Vec<Parameter> {
    let schema = schemars::schema_for!(T).to_value();
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let Some(properties) = schema.get("properties").and_then(Value::as_object)
    else {
        return vec![];
    };

    properties
        .iter()
        .map(|(name, property)| {
            let param = Parameter::new(name.as_str(), type_tag_of(property));
            if required.contains(&name.as_str()) {
                param
            } else {
                let default =
                    property.get("default").cloned().unwrap_or(Value::Null);
                param.with_default(default)
            }
        })
        .collect()
}

fn type_tag_of(property: &Value) -> TypeTag {
    let first_non_null = match property.get("type") {
        Some(Value::String(name)) => Some(name.as_str()),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .find(|name| *name != "null"),
        _ => None,
    };
    first_non_null
        .map(TypeTag::from_schema_type)
        .unwrap_or(TypeTag::Unknown)
}

/// Renders the model-facing description of one tool.
pub(crate) fn render_tool(
    name: &str,
    description: &str,
    parameters: &[Parameter],
) -> String {
    let mut object = Map::new();
    object.insert("name".to_owned(), Value::from(name));
    object.insert("description".to_owned(), Value::from(description));
    object.insert(
        "args".to_owned(),
        serde_json::to_value(parameters).unwrap_or_default(),
    );
    serde_json::to_string_pretty(&Value::Object(object)).unwrap_or_default()
}
