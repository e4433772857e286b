//! Slack integration for Sasha
//!
//! This crate holds everything between a raw Slack event and a reply:
//! - **Commands** (`commands`) - ordered regex command table, first match wins
//! - **Handlers** (`handlers`) - giggles, server time, WFH epoch, inspiration, language lookups
//! - **Bot** (`bot`) - trigger stripping and assembly of the default table
//! - **Events** (`events`) - message and block-action handling
//! - **Runner** (`runner`) - drains the in-process event queue into the dispatcher
//! - **Block Kit** (`blocks`) - rich message builders (help card, WFH epoch, bootup notices)
//! - **Delivery** (`delivery`) - outbound message/file and image fetch seams
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → MessageHandler → strip_trigger → CommandTable
//!                                         ↓                               ↓
//!                                  MessageDelivery ←── Reply (text | blocks)
//! ```
//!
//! # Key Types
//!
//! - `Sasha` - the assembled bot (table, help card, boot notices)
//! - `CommandTable` - registration-ordered command entries
//! - `EventRunner` - queue consumer that logs and skips failed dispatches
//! - `MessageDelivery` - trait the server implements over the Slack Web API

pub mod blocks;
pub mod bot;
pub mod commands;
pub mod delivery;
pub mod events;
pub mod handlers;
pub mod runner;

pub use bot::{strip_trigger, BotSettings, Collaborators, Sasha};
pub use commands::{CommandTable, DispatchContext, Reply};
