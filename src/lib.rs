//! Automode: prompt catalog, template resolution, and marker-driven workflow
//! core for autonomous coding agents.
//!
//! This crate is the headless core behind an "Auto Mode" coding-agent
//! workflow. It owns four concerns:
//!
//! - **Prompt registry** ([`registry`]): an immutable catalog of prompt
//!   slots grouped into categories, each with a built-in default text.
//! - **Customization store** ([`customize`]): sparse user overrides layered
//!   over the registry, togglable without data loss.
//! - **Template renderer** ([`template`]): `{{variable}}` substitution with
//!   missing-variable reporting.
//! - **Marker protocol + workflow engine** ([`marker`], [`workflow`]): a
//!   lexical parser that recovers control markers like `[PLAN_GENERATED]`
//!   from free-text agent output, and a resumable state machine that drives
//!   planning, approval, per-task execution, and learning extraction.
//!
//! The crate never talks to an LLM. Every operation that would prompt an
//! agent returns the rendered prompt text to the caller; the caller performs
//! the transport call and feeds the raw response back through
//! [`workflow::Orchestrator::advance`].

pub mod config;
pub mod customize;
pub mod error;
pub mod marker;
pub mod registry;
pub mod template;
pub mod workflow;
