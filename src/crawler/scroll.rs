//! Dynamic content handling
//!
//! Pages that load more content as the reader scrolls are driven to the
//! bottom until their height stops changing. Each page runs through a small
//! state machine:
//!
//! ```text
//! Idle -> Probing -> Scrolling -> Stable
//!   \________\__________________/
//! ```
//!
//! `Probing` is only entered under the smart policy: one scroll is issued and
//! the page is only scrolled further if it grew. Every path ends in
//! `Stable`, and the iteration cap bounds the loop regardless of what the
//! page reports.

use crate::config::CrawlerConfig;
use crate::crawler::loader::ScrollSurface;
use std::time::Duration;

/// When to scroll a page before reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPolicy {
    /// Read the page as loaded
    None,
    /// Scroll until the height stops growing
    Always,
    /// Probe with one scroll; continue only if the page grew
    Smart,
}

impl ScrollPolicy {
    /// Resolves the two crawl flags; smart scrolling wins when both are set
    pub fn from_flags(scroll: bool, smart_scroll: bool) -> Self {
        if smart_scroll {
            Self::Smart
        } else if scroll {
            Self::Always
        } else {
            Self::None
        }
    }
}

/// Scroll behavior for a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    pub policy: ScrollPolicy,
    /// Pause after each scroll before measuring again
    pub settle: Duration,
    /// Upper bound on scrolls after the first measurement
    pub max_iterations: u32,
}

impl ScrollSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            policy: ScrollPolicy::from_flags(config.scroll, config.smart_scroll),
            settle: Duration::from_millis(config.scroll_settle_ms),
            max_iterations: config.max_scroll_iterations,
        }
    }

    /// Same settings with a different policy
    pub fn with_policy(mut self, policy: ScrollPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            policy: ScrollPolicy::Smart,
            settle: Duration::from_millis(1000),
            max_iterations: 50,
        }
    }
}

/// Why a page stopped being scrolled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableReason {
    /// Policy was `None`
    NotRequested,
    /// Smart probe saw no growth
    StaticPage,
    /// Height stopped changing
    Converged,
    /// Iteration cap reached while the page kept growing
    IterationCap,
    /// Measuring or scrolling failed; the page is read as-is
    ScrollFailed,
}

/// Scroll state of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    Probing { baseline: u64 },
    Scrolling { last_height: u64, iterations: u32 },
    Stable(StableReason),
}

/// Outcome of settling one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    pub reason: StableReason,
    /// Number of scroll commands issued
    pub scrolls: u32,
    /// Last height measured, if any measurement succeeded
    pub final_height: Option<u64>,
}

/// Drives pages to a stable height
#[derive(Debug, Clone, Copy)]
pub struct DynamicContentHandler {
    settings: ScrollSettings,
}

impl DynamicContentHandler {
    pub fn new(settings: ScrollSettings) -> Self {
        Self { settings }
    }

    /// Scrolls `surface` according to the policy until it is stable
    ///
    /// Never fails: a scroll error ends the machine in
    /// `Stable(ScrollFailed)` and the page is read in whatever state it
    /// reached.
    pub async fn settle<S>(&self, surface: &mut S) -> ScrollReport
    where
        S: ScrollSurface + ?Sized,
    {
        let mut state = ScrollState::Idle;
        let mut scrolls = 0u32;
        let mut final_height = None;

        loop {
            state = match state {
                ScrollState::Idle => match self.settings.policy {
                    ScrollPolicy::None => ScrollState::Stable(StableReason::NotRequested),
                    policy => match surface.scroll_height().await {
                        Ok(height) => {
                            final_height = Some(height);
                            if policy == ScrollPolicy::Smart {
                                ScrollState::Probing { baseline: height }
                            } else {
                                ScrollState::Scrolling {
                                    last_height: height,
                                    iterations: 0,
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Could not measure page height: {}", e);
                            ScrollState::Stable(StableReason::ScrollFailed)
                        }
                    },
                },

                ScrollState::Probing { baseline } => match self.scroll_and_measure(surface).await {
                    Ok(height) => {
                        scrolls += 1;
                        final_height = Some(height);
                        if height > baseline {
                            ScrollState::Scrolling {
                                last_height: height,
                                iterations: 0,
                            }
                        } else {
                            ScrollState::Stable(StableReason::StaticPage)
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Scroll probe failed: {}", e);
                        ScrollState::Stable(StableReason::ScrollFailed)
                    }
                },

                ScrollState::Scrolling {
                    last_height,
                    iterations,
                } => {
                    if iterations >= self.settings.max_iterations {
                        ScrollState::Stable(StableReason::IterationCap)
                    } else {
                        match self.scroll_and_measure(surface).await {
                            Ok(height) => {
                                scrolls += 1;
                                final_height = Some(height);
                                if height == last_height {
                                    ScrollState::Stable(StableReason::Converged)
                                } else {
                                    ScrollState::Scrolling {
                                        last_height: height,
                                        iterations: iterations + 1,
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Scroll failed after {} iterations: {}", iterations, e);
                                ScrollState::Stable(StableReason::ScrollFailed)
                            }
                        }
                    }
                }

                ScrollState::Stable(reason) => {
                    return ScrollReport {
                        reason,
                        scrolls,
                        final_height,
                    };
                }
            };
        }
    }

    async fn scroll_and_measure<S>(&self, surface: &mut S) -> Result<u64, crate::FetchError>
    where
        S: ScrollSurface + ?Sized,
    {
        surface.scroll_to_bottom().await?;
        if !self.settings.settle.is_zero() {
            tokio::time::sleep(self.settings.settle).await;
        }
        surface.scroll_height().await
    }
}
