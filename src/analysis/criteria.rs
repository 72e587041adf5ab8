//! Fixed evaluation vocabulary for analysis passes.
//!
//! Scores are always on a 1-10 scale; fields the model omits or garbles are
//! defaulted to the neutral midpoint instead of failing the whole record.

/// Neutral midpoint used when an individual score is absent or unparseable.
pub const NEUTRAL_SCORE: u8 = 5;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

/// Coaching criteria every pass scores, keyed by the identifiers the model
/// is asked to echo back.
pub const COACHING_CRITERIA: &[(&str, &str)] = &[
    (
        "clear_vision",
        "The coach invites the client toward a clear, measurable, potentially transformative vision.",
    ),
    (
        "max_value",
        "The maximum value of the call is made explicit and the client reports it being created.",
    ),
    (
        "client_participation",
        "The client participates fully, exploring who they are becoming.",
    ),
    (
        "expand_possibilities",
        "The coach expands what the client believes is possible.",
    ),
    (
        "commitments_awareness",
        "Commitments are clear, with a growth process around any broken ones.",
    ),
    (
        "powerful_questions",
        "The coach's key tools are powerful questions and silence.",
    ),
    (
        "listening_levels",
        "The coach listens beyond the words and tests intuition when something is noticed.",
    ),
    (
        "client_ownership",
        "The coach invites ownership rather than consulting or solving for the client.",
    ),
    (
        "be_do_have",
        "The coach invites reinvention through being before doing and having.",
    ),
    (
        "disrupt_beliefs",
        "Limiting beliefs are disrupted and new actions created from insights.",
    ),
    (
        "insights_to_actions",
        "Client insights lead to actions and commitments.",
    ),
    (
        "energy_dance",
        "The coach moves with the client's energy in direct response to what is noticed.",
    ),
];

/// Core values every pass scores alignment with.
pub const CORE_VALUES: &[(&str, &str)] = &[
    ("growth", "Nudging awareness of the growth edge and inviting transformation"),
    ("ownership", "Inviting radical responsibility, moving beyond blame"),
    ("love", "Fierce advocacy for the client's vision and potential"),
    ("integrity", "Alignment with the client's stated commitments and values"),
    ("vision", "Amplifying or reconnecting to a compelling future"),
    ("energy", "Raising stakes, aliveness, and sense of possibility"),
];

/// Categories a suggestion may be filed under.
pub const SUGGESTION_CATEGORIES: &[(&str, &str)] = &[
    ("clarify_reflect", "Reflect or clarify statements that may hold hidden power"),
    ("expand_vision", "Push the client to think bigger or longer-term"),
    ("increase_ownership", "Challenge the client to take fuller responsibility"),
    ("reveal_cost_payoff", "Weigh hidden consequences or benefits of action and inaction"),
    ("interrupt_loop", "Disrupt circular logic, story, or victimhood"),
    ("probe_commitment", "Test how real the client is about their intentions"),
    ("double_click_emotion", "Slow down for emotional processing or buried insights"),
    ("connect_values", "Tie the client's current state to the core values explicitly"),
    ("spot_meta_moment", "Flag moments revealing patterns or breakthrough opportunities"),
];
