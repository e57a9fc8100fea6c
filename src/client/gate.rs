//! Leader/follower coordinator guaranteeing at most one refresh call at a time.
//!
//! The first caller that reports a 401 while the gate is idle becomes the leader and runs the
//! refresh. Callers arriving while the leader is busy enqueue a [`PendingRequest`] and wait.
//! When the leader settles, the queue is drained in FIFO order and every waiter receives the
//! same [`RefreshOutcome`]. The outcome of the last cascade is remembered together with the
//! access token it replaced, so a 401 that arrives late for that token adopts the result
//! instead of starting a second cascade. Cascades started by anonymous requests are never
//! remembered.

// std
use std::mem;
// self
use crate::{_prelude::*, auth::TokenSecret, session::ExpiryReason};

/// Result shared by every participant of a refresh cascade.
pub type RefreshOutcome = Result<TokenSecret, ExpiryReason>;

/// How a caller took part in a cascade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateRole {
	/// Ran the refresh.
	Leader,
	/// Waited for an in-flight refresh.
	Follower,
	/// Reused the outcome of a cascade that had already settled for the same stale token.
	Adopted,
}

/// Caller blocked on an in-flight refresh; resolved exactly once by the leader.
#[derive(Debug)]
pub struct PendingRequest {
	slot: Arc<OnceCell<RefreshOutcome>>,
}
impl PendingRequest {
	fn new() -> (Self, Arc<OnceCell<RefreshOutcome>>) {
		let slot = Arc::new(OnceCell::new());

		(Self { slot: slot.clone() }, slot)
	}

	fn resolve(self, outcome: &RefreshOutcome) {
		// Waiters whose future was dropped still own a slot; filling it is harmless.
		let _ = self.slot.set_blocking(outcome.clone());
	}
}

#[derive(Debug)]
struct Cascade {
	stale: Option<TokenSecret>,
	waiters: VecDeque<PendingRequest>,
}

#[derive(Debug)]
struct SettledCascade {
	stale: TokenSecret,
	outcome: RefreshOutcome,
}

#[derive(Debug, Default)]
struct GateState {
	in_flight: Option<Cascade>,
	settled: Option<SettledCascade>,
}

enum Entry {
	Leader,
	Follower(Arc<OnceCell<RefreshOutcome>>),
	Settled(RefreshOutcome),
}

/// Process-wide refresh coordinator: in-flight flag, follower queue, and last outcome.
#[derive(Debug, Default)]
pub struct RefreshGate {
	state: Mutex<GateState>,
}
impl RefreshGate {
	/// Returns `true` while a leader is refreshing.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_flight.is_some()
	}

	/// Number of followers currently waiting.
	pub fn queued(&self) -> usize {
		self.state.lock().in_flight.as_ref().map_or(0, |cascade| cascade.waiters.len())
	}

	/// Forgets the last settled outcome, e.g. after a login replaced the credential.
	pub fn reset(&self) {
		self.state.lock().settled = None;
	}

	/// Forgets the last settled outcome if it was a failure; a remembered success is kept.
	pub fn discard_failure(&self) {
		let mut state = self.state.lock();

		if state.settled.as_ref().is_some_and(|settled| settled.outcome.is_err()) {
			state.settled = None;
		}
	}

	/// Joins the cascade for a request that was sent with `stale` and answered 401.
	///
	/// `refresh` runs only if this caller becomes the leader. It is expected to perform every
	/// side effect of the cascade (persisting or clearing credentials, notifying observers)
	/// before it returns, because followers are released only afterwards.
	pub async fn acquire<F, Fut>(
		&self,
		stale: Option<&TokenSecret>,
		refresh: F,
	) -> (GateRole, RefreshOutcome)
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = RefreshOutcome>,
	{
		match self.enter(stale) {
			Entry::Settled(outcome) => (GateRole::Adopted, outcome),
			Entry::Follower(slot) => (GateRole::Follower, slot.wait().await.clone()),
			Entry::Leader => {
				let mut lead = LeaderGuard { gate: self, settled: false };
				let outcome = refresh().await;

				lead.settle(&outcome);

				(GateRole::Leader, outcome)
			},
		}
	}

	fn enter(&self, stale: Option<&TokenSecret>) -> Entry {
		let mut state = self.state.lock();

		if let Some(cascade) = state.in_flight.as_mut() {
			let (pending, slot) = PendingRequest::new();

			cascade.waiters.push_back(pending);

			return Entry::Follower(slot);
		}
		if let Some(settled) =
			state.settled.as_ref().filter(|settled| Some(&settled.stale) == stale)
		{
			return Entry::Settled(settled.outcome.clone());
		}

		state.in_flight = Some(Cascade { stale: stale.cloned(), waiters: VecDeque::new() });

		Entry::Leader
	}

	// Followers that enqueue while the queue is being drained join the same cascade; the flag
	// is cleared only once a drain pass finds the queue empty.
	fn settle(&self, outcome: &RefreshOutcome, remember: bool) {
		loop {
			let drained = {
				let mut state = self.state.lock();
				let Some(cascade) = state.in_flight.as_mut() else {
					return;
				};

				if cascade.waiters.is_empty() {
					let stale = cascade.stale.take();

					state.in_flight = None;
					// Anonymous cascades have no token to key on.
					state.settled = stale
						.filter(|_| remember)
						.map(|stale| SettledCascade { stale, outcome: outcome.clone() });

					return;
				}

				mem::take(&mut cascade.waiters)
			};

			for pending in drained {
				pending.resolve(outcome);
			}
		}
	}
}

struct LeaderGuard<'a> {
	gate: &'a RefreshGate,
	settled: bool,
}
impl LeaderGuard<'_> {
	fn settle(&mut self, outcome: &RefreshOutcome) {
		self.settled = true;
		self.gate.settle(outcome, true);
	}
}
impl Drop for LeaderGuard<'_> {
	fn drop(&mut self) {
		if !self.settled {
			let abandoned = Err(ExpiryReason::RefreshFailed {
				message: "the refresh was abandoned before it settled".into(),
			});

			self.gate.settle(&abandoned, false);
		}
	}
}
