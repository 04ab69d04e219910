/// `context` is diagnostic: an old/new pair, or a free-form note explaining
/// *why* a command was emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextReason {
	Diff { old: serde_json::Value, new: serde_json::Value },
	Note(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandContext {
	pub reason: ContextReason,
	/// Attributes the command to the object that caused it, used by
	/// external tracing.
	pub timeline_obj_id: Option<String>,
}

impl CommandContext {
	#[must_use]
	pub fn note(text: impl Into<String>) -> Self {
		Self {
			reason: ContextReason::Note(text.into()),
			timeline_obj_id: None,
		}
	}

	#[must_use]
	pub fn diff(old: serde_json::Value, new: serde_json::Value) -> Self {
		Self {
			reason: ContextReason::Diff { old, new },
			timeline_obj_id: None,
		}
	}

	#[must_use]
	pub fn for_object(mut self, timeline_obj_id: impl Into<String>) -> Self {
		self.timeline_obj_id = Some(timeline_obj_id.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandWithContext<C> {
	pub command: C,
	pub context: CommandContext,
}

impl<C> CommandWithContext<C> {
	pub fn new(command: C, context: CommandContext) -> Self {
		Self { command, context }
	}
}
