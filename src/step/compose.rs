//! Step declaration shapes and their resolution into single handlers.
//!
//! Every stage may be declared in up to four slots (base, default, pre,
//! post), and each declaration takes one of three shapes: a single handler,
//! an ordered list, or a map keyed by stage name (for handlers invoked from
//! several call sites, primarily the exception handler). Resolution happens
//! once, at pipeline construction; requests only ever see plain handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ConfigError;
use crate::step::context::StepContext;
use crate::step::handler::{Step, StepHandler, StepResult};
use crate::step::stage::Stage;

/// A caller-supplied value for one stage slot.
///
/// The shape is fixed at declaration time; no runtime probing.
pub enum StepDeclaration {
    /// Used directly, ignoring any default for the stage.
    Single(StepHandler),
    /// All members run in order; their boolean results are ORed.
    List(Vec<StepHandler>),
    /// Looked up by `current_step` at invocation time, falling through to
    /// the stage's default on a miss or a falsy result.
    Keyed(HashMap<Stage, StepHandler>),
}

impl StepDeclaration {
    /// Single-handler declaration from a concrete step.
    pub fn single(step: impl Step + 'static) -> Self {
        StepDeclaration::Single(Arc::new(step))
    }
}

impl From<StepHandler> for StepDeclaration {
    fn from(handler: StepHandler) -> Self {
        StepDeclaration::Single(handler)
    }
}

impl From<Vec<StepHandler>> for StepDeclaration {
    fn from(handlers: Vec<StepHandler>) -> Self {
        StepDeclaration::List(handlers)
    }
}

impl From<HashMap<Stage, StepHandler>> for StepDeclaration {
    fn from(handlers: HashMap<Stage, StepHandler>) -> Self {
        StepDeclaration::Keyed(handlers)
    }
}

/// Runs a list of handlers in order, ORing their results.
struct ListStep {
    steps: Vec<StepHandler>,
}

#[async_trait]
impl Step for ListStep {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        let mut handled = false;
        for step in &self.steps {
            handled = step.run(context).await? || handled;
        }
        Ok(handled)
    }
}

/// Dispatches on `current_step`, with an optional fallback.
struct KeyedStep {
    steps: HashMap<Stage, StepHandler>,
    fallback: Option<StepHandler>,
}

#[async_trait]
impl Step for KeyedStep {
    async fn run(&self, context: &mut StepContext) -> StepResult {
        let step = context
            .current_step
            .and_then(|stage| self.steps.get(&stage))
            .cloned();

        let mut handled = match step {
            Some(step) => step.run(context).await?,
            None => false,
        };

        if !handled {
            if let Some(fallback) = &self.fallback {
                handled = fallback.run(context).await?;
            }
        }

        Ok(handled)
    }
}

/// Collapse a handler list: none stays none, one is passed through, more
/// are wrapped.
pub(crate) fn list_step(steps: Vec<StepHandler>) -> Option<StepHandler> {
    match steps.len() {
        0 => None,
        1 => steps.into_iter().next(),
        _ => Some(Arc::new(ListStep { steps })),
    }
}

/// Build a keyed-dispatch handler; an empty map degenerates to the fallback.
pub(crate) fn keyed_step(
    steps: HashMap<Stage, StepHandler>,
    fallback: Option<StepHandler>,
) -> Option<StepHandler> {
    if steps.is_empty() {
        return fallback;
    }
    Some(Arc::new(KeyedStep { steps, fallback }))
}

fn resolve_declaration(declaration: Option<StepDeclaration>) -> Option<StepHandler> {
    match declaration {
        None => None,
        Some(StepDeclaration::Single(handler)) => Some(handler),
        Some(StepDeclaration::List(handlers)) => list_step(handlers),
        Some(StepDeclaration::Keyed(handlers)) => keyed_step(handlers, None),
    }
}

/// Resolve the four slots of one stage into a single handler, or `None`
/// when the stage is absent.
///
/// `default` is resolved on its own; `base` wins when it resolves to a
/// handler, with the resolved default serving as the keyed fallback and as
/// the body when the base resolves to nothing (an empty list); `pre` and
/// `post` bracket the body with no fallback of their own.
pub fn ensure_single_step(
    base: Option<StepDeclaration>,
    default: Option<StepDeclaration>,
    pre: Option<StepDeclaration>,
    post: Option<StepDeclaration>,
) -> Option<StepHandler> {
    let default = resolve_declaration(default);
    let body = match base {
        None => default,
        Some(StepDeclaration::Single(handler)) => Some(handler),
        Some(StepDeclaration::List(handlers)) => list_step(handlers).or(default),
        Some(StepDeclaration::Keyed(handlers)) => keyed_step(handlers, default),
    }?;

    let pre = resolve_declaration(pre);
    let post = resolve_declaration(post);

    let chain: Vec<StepHandler> = [pre, Some(body), post].into_iter().flatten().collect();
    list_step(chain)
}

/// The slot a suffix-keyed declaration lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Base,
    Default,
    Pre,
    Post,
}

fn split_name(name: &str) -> Result<(Stage, Slot), ConfigError> {
    for (suffix, slot) in [
        ("_default", Slot::Default),
        ("_pre", Slot::Pre),
        ("_post", Slot::Post),
    ] {
        if let Some(stem) = name.strip_suffix(suffix) {
            return Ok((stem.parse()?, slot));
        }
    }
    Ok((name.parse()?, Slot::Base))
}

/// Per-stage base/default/pre/post declarations for one pipeline.
///
/// Later entries for the same stage and slot replace earlier ones, so a
/// defaults fragment can be built first and selectively overridden.
#[derive(Default)]
pub struct StepsDefinition {
    base: HashMap<Stage, StepDeclaration>,
    defaults: HashMap<Stage, StepDeclaration>,
    pre: HashMap<Stage, StepDeclaration>,
    post: HashMap<Stage, StepDeclaration>,
}

impl StepsDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base declaration for a stage.
    pub fn base(mut self, stage: Stage, declaration: impl Into<StepDeclaration>) -> Self {
        self.base.insert(stage, declaration.into());
        self
    }

    /// Set the default declaration for a stage.
    pub fn default_for(mut self, stage: Stage, declaration: impl Into<StepDeclaration>) -> Self {
        self.defaults.insert(stage, declaration.into());
        self
    }

    /// Set the pre declaration for a stage.
    pub fn pre(mut self, stage: Stage, declaration: impl Into<StepDeclaration>) -> Self {
        self.pre.insert(stage, declaration.into());
        self
    }

    /// Set the post declaration for a stage.
    pub fn post(mut self, stage: Stage, declaration: impl Into<StepDeclaration>) -> Self {
        self.post.insert(stage, declaration.into());
        self
    }

    /// Route a declaration by its suffix-keyed name, e.g. `"business"`,
    /// `"deserialize_default"`, `"check_headers_pre"`.
    ///
    /// An unknown stage or pseudo-suffix token is a fatal configuration
    /// error.
    pub fn insert_named(
        &mut self,
        name: &str,
        declaration: impl Into<StepDeclaration>,
    ) -> Result<(), ConfigError> {
        let (stage, slot) = split_name(name)?;
        let slot_map = match slot {
            Slot::Base => &mut self.base,
            Slot::Default => &mut self.defaults,
            Slot::Pre => &mut self.pre,
            Slot::Post => &mut self.post,
        };
        slot_map.insert(stage, declaration.into());
        Ok(())
    }

    /// Overlay `other` on top of this definition; `other`'s entries win.
    pub fn merge(mut self, other: StepsDefinition) -> Self {
        self.base.extend(other.base);
        self.defaults.extend(other.defaults);
        self.pre.extend(other.pre);
        self.post.extend(other.post);
        self
    }

    /// Resolve every stage's slots into single handlers.
    pub fn resolve(mut self) -> ResolvedSteps {
        let mut steps = HashMap::new();
        for stage in Stage::ALL {
            let resolved = ensure_single_step(
                self.base.remove(&stage),
                self.defaults.remove(&stage),
                self.pre.remove(&stage),
                self.post.remove(&stage),
            );
            if let Some(handler) = resolved {
                steps.insert(stage, handler);
            }
        }
        ResolvedSteps { steps }
    }
}

/// One resolved handler per defined stage.
pub struct ResolvedSteps {
    steps: HashMap<Stage, StepHandler>,
}

impl ResolvedSteps {
    pub fn get(&self, stage: Stage) -> Option<&StepHandler> {
        self.steps.get(&stage)
    }

    pub fn take(&mut self, stage: Stage) -> Option<StepHandler> {
        self.steps.remove(&stage)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
