//! Event dispatch — maps chat events onto punchcard operations and
//! renders replies as plain text.
//!
//! Privileged commands require the actor's manage permission. Amount
//! rejections become replies; storage failures propagate as errors.

use std::fmt;

use punch_engine::{AdjustOutcome, PunchOutcome, UserRecord};
use serde::Deserialize;
use tracing::debug;

use crate::error::RuntimeError;
use crate::ledger_store::LedgerStore;
use crate::punchcard::SharedPunchcard;

/// Inbound chat event, one per JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Message { author: Author, content: String },
    Command { actor: Actor, command: Command },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(default)]
    pub can_manage: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Command {
    AddPunches { user: String, amount: i64 },
    RemovePunches { user: String, amount: i64 },
    AddFreeOrders { user: String, count: i64 },
    RemoveFreeOrders { user: String, count: i64 },
    AddReferrals { user: String, amount: i64 },
    RemoveReferrals { user: String, amount: i64 },
    Stats {
        #[serde(default)]
        user: Option<String>,
    },
}

impl Command {
    pub fn requires_manage(&self) -> bool {
        !matches!(self, Command::Stats { .. })
    }

    /// Word used when rejecting a non-positive amount.
    fn amount_label(&self) -> &'static str {
        match self {
            Command::AddFreeOrders { .. } | Command::RemoveFreeOrders { .. } => "Count",
            _ => "Amount",
        }
    }
}

/// Rendered response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Punched {
        user: String,
        record: UserRecord,
        punches_per_reward: u64,
        remaining: u64,
    },
    FreeOrderEarned {
        user: String,
        record: UserRecord,
    },
    PunchesAdded {
        user: String,
        amount: i64,
        outcome: PunchOutcome,
        punches_per_reward: u64,
    },
    PunchesRemoved {
        user: String,
        amount: i64,
        record: UserRecord,
        punches_per_reward: u64,
    },
    FreeOrdersAdded {
        user: String,
        outcome: AdjustOutcome,
    },
    FreeOrdersRemoved {
        user: String,
        outcome: AdjustOutcome,
        punches_per_reward: u64,
    },
    ReferralsAdded {
        user: String,
        outcome: AdjustOutcome,
    },
    ReferralsRemoved {
        user: String,
        outcome: AdjustOutcome,
    },
    Stats {
        user: String,
        record: UserRecord,
        punches_per_reward: u64,
        remaining: u64,
    },
    PermissionDenied,
    InvalidAmount {
        label: &'static str,
    },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Punched {
                user,
                record,
                punches_per_reward,
                remaining,
            } => write!(
                f,
                "✅ +1 punch added to <@{user}> | {}/{punches_per_reward} punches, \
                 {remaining} more until free order!",
                record.punches
            ),
            Reply::FreeOrderEarned { user, record } => write!(
                f,
                "🎉 FREE ORDER EARNED! <@{user}> just earned a free order! \
                 Free Orders: {} | Referrals: {}",
                record.free_orders, record.referrals
            ),
            Reply::PunchesAdded {
                user,
                amount,
                outcome,
                punches_per_reward,
            } => {
                write!(
                    f,
                    "✅ Added {amount} punches to <@{user}> | {}/{punches_per_reward} punches, \
                     {} free orders",
                    outcome.record.punches, outcome.record.free_orders
                )?;
                if outcome.rewarded() {
                    write!(f, " | 🎉 +{} free orders!", outcome.rewards_earned)?;
                }
                Ok(())
            }
            Reply::PunchesRemoved {
                user,
                amount,
                record,
                punches_per_reward,
            } => write!(
                f,
                "✅ Removed {amount} punches from <@{user}> | {}/{punches_per_reward} punches",
                record.punches
            ),
            Reply::FreeOrdersAdded { user, outcome } => write!(
                f,
                "🎁 Added {} free order(s) to <@{user}> | {} free orders",
                outcome.applied, outcome.record.free_orders
            ),
            Reply::FreeOrdersRemoved {
                user,
                outcome,
                punches_per_reward,
            } => {
                write!(
                    f,
                    "🎁 Removed {} free order(s) from <@{user}> | {} remaining, \
                     {}/{punches_per_reward} punches",
                    outcome.applied, outcome.record.free_orders, outcome.record.punches
                )?;
                if outcome.clamped() {
                    write!(
                        f,
                        " | ⚠️ User only had {} free order(s) available.",
                        outcome.previous
                    )?;
                }
                Ok(())
            }
            Reply::ReferralsAdded { user, outcome } => write!(
                f,
                "👥 Added {} referral(s) to <@{user}> | {} total referrals",
                outcome.applied, outcome.record.referrals
            ),
            Reply::ReferralsRemoved { user, outcome } => {
                write!(
                    f,
                    "👥 Removed {} referral(s) from <@{user}> | {} remaining",
                    outcome.applied, outcome.record.referrals
                )?;
                if outcome.clamped() {
                    write!(
                        f,
                        " | ⚠️ User only had {} referral(s) available.",
                        outcome.previous
                    )?;
                }
                Ok(())
            }
            Reply::Stats {
                user,
                record,
                punches_per_reward,
                remaining,
            } => write!(
                f,
                "📊 Punchcard for <@{user}> | Punches: {}/{punches_per_reward} | \
                 Free Orders: {} | Referrals: {} | Next reward: {remaining} punches away",
                record.punches, record.free_orders, record.referrals
            ),
            Reply::PermissionDenied => write!(f, "❌ You need 'Manage Messages' permission."),
            Reply::InvalidAmount { label } => write!(f, "❌ {label} must be positive."),
        }
    }
}

/// Routes events into a shared punchcard.
pub struct Dispatcher<S> {
    punchcard: SharedPunchcard<S>,
}

impl<S: LedgerStore> Dispatcher<S> {
    pub fn new(punchcard: SharedPunchcard<S>) -> Self {
        Self { punchcard }
    }

    pub fn punchcard(&self) -> &SharedPunchcard<S> {
        &self.punchcard
    }

    /// Handle one event. `Ok(None)` means nothing to say.
    pub fn handle(&self, event: &Event) -> Result<Option<Reply>, RuntimeError> {
        match event {
            Event::Message { author, content } => self.handle_message(author, content),
            Event::Command { actor, command } => self.handle_command(actor, command).map(Some),
        }
    }

    fn handle_message(
        &self,
        author: &Author,
        content: &str,
    ) -> Result<Option<Reply>, RuntimeError> {
        let Some(punch) = self
            .punchcard
            .record_message(&author.id, author.bot, content)?
        else {
            return Ok(None);
        };
        let engine = self.punchcard.engine();
        let record = punch.outcome.record;
        let reply = if punch.outcome.rewarded() {
            Reply::FreeOrderEarned {
                user: author.id.clone(),
                record,
            }
        } else {
            Reply::Punched {
                user: author.id.clone(),
                record,
                punches_per_reward: engine.punches_per_reward(),
                remaining: engine.punches_remaining(&record),
            }
        };
        Ok(Some(reply))
    }

    fn handle_command(&self, actor: &Actor, command: &Command) -> Result<Reply, RuntimeError> {
        if command.requires_manage() && !actor.can_manage {
            debug!(actor = %actor.id, ?command, "command rejected: missing permission");
            return Ok(Reply::PermissionDenied);
        }
        match self.run_command(actor, command) {
            Err(e) if e.is_invalid_amount() => Ok(Reply::InvalidAmount {
                label: command.amount_label(),
            }),
            other => other,
        }
    }

    fn run_command(&self, actor: &Actor, command: &Command) -> Result<Reply, RuntimeError> {
        let punchcard = &self.punchcard;
        let punches_per_reward = punchcard.engine().punches_per_reward();
        let reply = match command {
            Command::AddPunches { user, amount } => Reply::PunchesAdded {
                user: user.clone(),
                amount: *amount,
                outcome: punchcard.add_punches(user, *amount)?,
                punches_per_reward,
            },
            Command::RemovePunches { user, amount } => Reply::PunchesRemoved {
                user: user.clone(),
                amount: *amount,
                record: punchcard.remove_punches(user, *amount)?,
                punches_per_reward,
            },
            Command::AddFreeOrders { user, count } => Reply::FreeOrdersAdded {
                user: user.clone(),
                outcome: punchcard.add_free_orders(user, *count)?,
            },
            Command::RemoveFreeOrders { user, count } => Reply::FreeOrdersRemoved {
                user: user.clone(),
                outcome: punchcard.remove_free_orders(user, *count)?,
                punches_per_reward,
            },
            Command::AddReferrals { user, amount } => Reply::ReferralsAdded {
                user: user.clone(),
                outcome: punchcard.add_referrals(user, *amount)?,
            },
            Command::RemoveReferrals { user, amount } => Reply::ReferralsRemoved {
                user: user.clone(),
                outcome: punchcard.remove_referrals(user, *amount)?,
            },
            Command::Stats { user } => {
                let target = user.as_deref().unwrap_or(&actor.id);
                let record = punchcard.stats(target)?;
                Reply::Stats {
                    user: target.to_string(),
                    record,
                    punches_per_reward,
                    remaining: punchcard.engine().punches_remaining(&record),
                }
            }
        };
        Ok(reply)
    }
}
