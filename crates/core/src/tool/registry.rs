use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::Instrument;

use super::parameter::render_tool;
use super::{
    AnyTool, Error, FnTool, Parameter, Tool, ToolFuture, ToolObject, ToolResult,
};
use crate::message::ToolArgs;

/// A registered tool: what the model is told about it, and how to call it.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    object: Arc<dyn ToolObject>,
}

impl ToolDescriptor {
    /// Returns the unique name of the tool.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description shown to the model.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared parameters, in calling order.
    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Binds call arguments to parameter names.
    ///
    /// Positional arguments are matched to parameters in declaration order,
    /// keyed arguments are taken as given. Omitted parameters with a non-null
    /// default receive it.
    pub fn bind(&self, args: &ToolArgs) -> Result<Map<String, Value>, Error> {
        let mut bound = match args {
            ToolArgs::Positional(values) => {
                if values.len() > self.parameters.len() {
                    return Err(Error::invalid_input().with_reason(format!(
                        "`{}` takes {} argument(s) but {} were given",
                        self.name,
                        self.parameters.len(),
                        values.len()
                    )));
                }
                self.parameters
                    .iter()
                    .zip(values)
                    .map(|(param, value)| {
                        (param.name().to_owned(), value.clone())
                    })
                    .collect()
            }
            ToolArgs::Keyed(map) => map.clone(),
        };
        for param in &self.parameters {
            if !param.has_default()
                || param.default_value().is_null()
                || bound.contains_key(param.name())
            {
                continue;
            }
            bound.insert(
                param.name().to_owned(),
                param.default_value().clone(),
            );
        }
        Ok(bound)
    }

    /// Renders the model-facing description of this tool.
    #[inline]
    pub fn render(&self) -> String {
        render_tool(&self.name, &self.description, &self.parameters)
    }
}

impl Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// The set of tools the model may call.
///
/// Tools keep the order they were registered in. Registering a name again
/// replaces the earlier tool in place.
#[derive(Default)]
pub struct Registry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool and returns its descriptor.
    pub fn register<T: Tool>(&mut self, tool: T) -> &ToolDescriptor {
        let descriptor = ToolDescriptor {
            name: tool.name().to_owned(),
            description: tool.description().to_owned(),
            parameters: tool.parameters().to_vec(),
            object: Arc::new(AnyTool(tool)),
        };
        self.insert(descriptor)
    }

    /// Registers a closure as a tool.
    ///
    /// The closure receives the arguments already bound to the names in
    /// `parameters`.
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<Parameter>,
        f: F,
    ) -> &ToolDescriptor
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        let descriptor = ToolDescriptor {
            name: name.into(),
            description: description.into(),
            parameters,
            object: Arc::new(FnTool(f)),
        };
        self.insert(descriptor)
    }

    /// Registers a tool, builder style.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    fn insert(&mut self, descriptor: ToolDescriptor) -> &ToolDescriptor {
        let idx = match self.index.get(&descriptor.name) {
            Some(&idx) => {
                debug!("replacing tool: {}", descriptor.name);
                self.tools[idx] = descriptor;
                idx
            }
            None => {
                let idx = self.tools.len();
                self.index.insert(descriptor.name.clone(), idx);
                self.tools.push(descriptor);
                idx
            }
        };
        &self.tools[idx]
    }

    /// Looks up a tool by name.
    #[inline]
    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&idx| &self.tools[idx])
    }

    /// Calls `descriptor` with `args`.
    ///
    /// The returned future does not borrow the registry.
    pub fn invoke(
        &self,
        descriptor: &ToolDescriptor,
        args: &ToolArgs,
    ) -> ToolFuture {
        let arguments = match descriptor.bind(args) {
            Ok(arguments) => arguments,
            Err(err) => return Box::pin(std::future::ready(Err(err))),
        };
        trace!("invoking `{}` with args: {arguments:?}", descriptor.name);
        let span = debug_span!("tool execute", tool = %descriptor.name);
        Box::pin(descriptor.object.execute(arguments).instrument(span))
    }

    /// Renders every tool, in registration order, for the system prompt.
    pub fn render_schema(&self) -> String {
        self.tools
            .iter()
            .map(ToolDescriptor::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns an iterator over the registered tools.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::tool::{ErrorKind, TypeTag, parameters_of};

    #[derive(Deserialize, JsonSchema)]
    struct RepeatInput {
        text: String,
        #[serde(default = "default_times")]
        times: usize,
    }

    fn default_times() -> usize {
        2
    }

    struct RepeatTool {
        parameters: Vec<Parameter>,
    }

    impl RepeatTool {
        fn new() -> Self {
            Self {
                parameters: parameters_of::<RepeatInput>(),
            }
        }
    }

    impl Tool for RepeatTool {
        type Input = RepeatInput;

        fn name(&self) -> &str {
            "repeat"
        }

        fn description(&self) -> &str {
            "Repeats the text."
        }

        fn parameters(&self) -> &[Parameter] {
            &self.parameters
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.text.repeat(input.times)))
        }
    }

    fn echo_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_fn(
            "echo",
            "Returns its argument.",
            vec![Parameter::new("x", TypeTag::String)],
            |args| {
                let x =
                    args.get("x").and_then(Value::as_str).map(str::to_owned);
                ready(x.ok_or_else(|| {
                    Error::invalid_input().with_reason("missing `x`")
                }))
            },
        );
        registry
    }

    #[tokio::test]
    async fn test_invoke_positional() {
        let registry = echo_registry();
        let echo = registry.resolve("echo").unwrap();
        let args = ToolArgs::Positional(vec![json!("a")]);
        assert_eq!(registry.invoke(echo, &args).await.unwrap(), "a");

        let args = ToolArgs::Positional(vec![json!("a"), json!("b")]);
        let err = registry.invoke(echo, &args).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert!(registry.resolve("ghost").is_none());
    }

    #[tokio::test]
    async fn test_invoke_typed_tool() {
        let registry = Registry::new().with_tool(RepeatTool::new());
        let repeat = registry.resolve("repeat").unwrap();

        let args = ToolArgs::Positional(vec![json!("ab")]);
        assert_eq!(registry.invoke(repeat, &args).await.unwrap(), "abab");

        let args =
            ToolArgs::from_value(json!({ "text": "x", "times": 3 })).unwrap();
        assert_eq!(registry.invoke(repeat, &args).await.unwrap(), "xxx");

        let args = ToolArgs::Positional(vec![json!(42)]);
        let err = registry.invoke(repeat, &args).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_bind_defaults() {
        let mut registry = Registry::new();
        let descriptor = registry
            .register_fn(
                "list",
                "",
                vec![
                    Parameter::new("target_path", TypeTag::String),
                    Parameter::new("absolute", TypeTag::Boolean)
                        .with_default(false),
                ],
                |_| ready(Ok(String::new())),
            )
            .clone();
        let bound = descriptor
            .bind(&ToolArgs::Positional(vec![json!("/tmp")]))
            .unwrap();
        assert_eq!(
            Value::Object(bound),
            json!({ "target_path": "/tmp", "absolute": false })
        );
    }

    #[test]
    fn test_order_and_replacement() {
        let mut registry = echo_registry();
        registry.register(RepeatTool::new());
        registry.register_fn("echo", "Replaced.", vec![], |_| {
            ready(Ok(String::new()))
        });

        let names: Vec<_> = registry.iter().map(ToolDescriptor::name).collect();
        assert_eq!(names, ["echo", "repeat"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve("echo").unwrap().description(),
            "Replaced."
        );

        let schema = registry.render_schema();
        let echo_at = schema.find("\"name\": \"echo\"").unwrap();
        let repeat_at = schema.find("\"name\": \"repeat\"").unwrap();
        assert!(echo_at < repeat_at);
        assert!(schema.contains("}\n{"));
    }
}
