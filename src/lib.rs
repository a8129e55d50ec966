//! # Notification Scheduler
//!
//! An impression-aware scheduling and throttling core for user-facing
//! notifications.
//!
//! Features (clients) ask the scheduler to show notifications. The scheduler
//! decides whether a notification may be shown right now based on each
//! client's impression history, and otherwise persists it until a background
//! task wakes the process at the next morning or evening slot.
//!
//! ## Core Problem Solved
//!
//! Notifications are cheap to send and expensive to get wrong:
//!
//! - **Daily caps**: each client has a quota that grows with positive feedback
//! - **Suppression**: negative feedback (or a run of dismisses) silences a client
//!   until the cooldown expires or enough neutral impressions accumulate
//! - **Asynchronous startup**: persisted state loads asynchronously, and callers
//!   must not have to care whether loading finished
//!
//! ## Components
//!
//! - [`core::ImpressionHistoryTracker`]: per-client impressions, feedback and quotas
//! - [`core::NotificationSchedulerImpl`]: coordinates the tracker, the pending
//!   store, display clients and background wake-ups
//! - [`core::InitAwareNotificationScheduler`]: buffers calls until `init` resolves
//! - [`builders::SchedulerBuilder`]: assembles everything from [`config::SchedulerConfig`]
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use notification_scheduler::builders::SchedulerBuilder;
//! use notification_scheduler::config::SchedulerConfig;
//! use notification_scheduler::core::{
//!     NotificationData, NotificationParams, NotificationScheduler, ScheduleParams,
//!     SchedulerClientType,
//! };
//!
//! let scheduler = SchedulerBuilder::new(SchedulerConfig::default())
//!     .with_client(SchedulerClientType::ReadingList, my_client)
//!     .build_init_aware()?;
//!
//! // Buffered until init completes.
//! scheduler
//!     .schedule(NotificationParams::new(
//!         SchedulerClientType::ReadingList,
//!         NotificationData::default(),
//!         ScheduleParams::default(),
//!     ))
//!     .await?;
//! scheduler.init().await?;
//! ```
//!
//! For complete flows, see `tests/scheduler_flow_test.rs` and
//! `tests/init_aware_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and throttling state.
pub mod core;
/// Configuration models for throttling policy and store backends.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for persisted stores.
pub mod infra;
/// Runtime adapters for background wake-ups.
pub mod runtime;
/// Shared utilities.
pub mod util;
