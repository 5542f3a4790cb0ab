/// Progress of one offer/answer exchange.
///
/// Single-shot: `Closed` is terminal, a new exchange needs a new negotiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    OfferSent,
    AnswerSent,
    Connected,
    Closed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        self == NegotiationState::Closed
    }
}
