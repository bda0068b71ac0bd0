// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	obs::{self, OpKind},
};

/// Span wrapper for manager operations; an empty shell when `tracing` is disabled.
#[derive(Clone, Debug)]
pub struct OpSpan {
	kind: OpKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Opens a `secure_token_manager.op` span tagged with `op` and `stage`.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"secure_token_manager.op",
				op = kind.as_str(),
				stage,
				elapsed_ms = tracing::field::Empty
			);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Operation this span belongs to.
	pub fn kind(&self) -> OpKind {
		self.kind
	}

	/// Drives `fut` inside the span and records its wall-clock duration.
	///
	/// The span is attached per poll, so no guard is held across `.await` points.
	pub async fn run<Fut>(&self, fut: Fut) -> Fut::Output
	where
		Fut: Future,
	{
		let started = Instant::now();
		#[cfg(feature = "tracing")]
		let output = {
			use tracing::Instrument;

			fut.instrument(self.span.clone()).await
		};
		#[cfg(not(feature = "tracing"))]
		let output = fut.await;
		let elapsed = started.elapsed();

		#[cfg(feature = "tracing")]
		self.span.record("elapsed_ms", u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
		obs::record_op_duration(self.kind, elapsed);

		output
	}
}

/// Logs and counts a failure that was absorbed instead of surfaced.
pub(crate) fn warn_recovered(kind: OpKind, what: &'static str, error: &dyn Display) {
	obs::record_recovery(kind);

	#[cfg(feature = "tracing")]
	tracing::warn!(op = kind.as_str(), %error, "{what}");
	#[cfg(not(feature = "tracing"))]
	let _ = (what, error);
}
