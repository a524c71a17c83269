/// Execution classes used for spawn tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// A resolution pipeline driving identifier lookup and fetches.
	Resolution,
	/// Best-effort enrichment such as the install attribution handshake.
	Background,
	/// Delivery of results onto a dispatcher.
	Delivery,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Resolution => "resolution",
			Self::Background => "background",
			Self::Delivery => "delivery",
		}
	}
}
