//! Template engine based on MiniJinja

use appdeploy_core::{ProcessVariables, RenderedManifest};
use minijinja::Environment;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, TemplateError};
use crate::filters;
use crate::functions;
use crate::identify::identify;

/// Hook run against every freshly created environment
///
/// This is how callers register their own template functions and filters.
pub type Extension = Arc<dyn Fn(&mut Environment<'static>) + Send + Sync>;

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
    extensions: Vec<Extension>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            strict_mode: true,
            extensions: Vec::new(),
        }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Register custom functions or filters
    ///
    /// ```
    /// use appdeploy_engine::Engine;
    ///
    /// let engine = Engine::builder()
    ///     .extension(|env| env.add_function("team", || "platform"))
    ///     .build();
    /// ```
    pub fn extension<F>(mut self, extension: F) -> Self
    where
        F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
    {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Build the engine
    pub fn build(self) -> Engine {
        Engine {
            strict_mode: self.strict_mode,
            extensions: self.extensions,
        }
    }
}

/// The template engine
#[derive(Clone)]
pub struct Engine {
    strict_mode: bool,
    extensions: Vec<Extension>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("strict_mode", &self.strict_mode)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

impl Engine {
    /// Create a new engine without extensions
    pub fn new(strict_mode: bool) -> Self {
        Self {
            strict_mode,
            extensions: Vec::new(),
        }
    }

    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create a configured MiniJinja environment
    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
        }

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("indent", filters::indent);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("required", filters::required);

        env.add_function("variable", functions::variable);
        env.add_function("fail", functions::fail);
        env.add_function("list", functions::list);
        env.add_function("dict", functions::dict);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);

        for extension in &self.extensions {
            extension(&mut env);
        }

        env
    }

    /// Render a single template
    ///
    /// Returns `None` when the output trims to nothing (or to a bare `---`),
    /// which is how a template omits its resource entirely.
    pub fn render(
        &self,
        name: &str,
        template: &str,
        vars: &ProcessVariables,
    ) -> Result<Option<String>> {
        let mut env = self.create_environment();

        env.add_template_owned(name.to_string(), template.to_string())
            .map_err(|e| TemplateError::from_minijinja(e, name, template))?;

        let tmpl = env
            .get_template(name)
            .map_err(|e| TemplateError::from_minijinja(e, name, template))?;

        let rendered = tmpl
            .render(vars)
            .map_err(|e| TemplateError::from_minijinja(e, name, template))?;

        let trimmed = rendered.trim();
        if trimmed.is_empty() || trimmed == "---" {
            return Ok(None);
        }

        Ok(Some(trimmed.to_string()))
    }

    /// Render a template and identify the resulting manifest
    pub fn render_manifest(
        &self,
        name: &str,
        template: &str,
        vars: &ProcessVariables,
    ) -> Result<Option<RenderedManifest>> {
        let Some(rendered) = self.render(name, template, vars)? else {
            return Ok(None);
        };

        let manifest = identify(name, rendered.as_bytes())?;
        Ok(Some(RenderedManifest::new(manifest, rendered)))
    }
}
