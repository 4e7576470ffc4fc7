//! Reconciles requested time windows with the bounds an archive reports for a storm.
//!
//! A bound is either an absolute time or an offset whose anchor (start or end of the
//! reference window) is chosen by the caller.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntervalError {
    #[error("start time ({start}) exceeds end time ({end})")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("start offset ({start}) exceeds end offset ({end})")]
    InvertedOffsets { start: Duration, end: Duration },
    #[error("time interval is empty")]
    Empty,
    #[error("time {time} is outside of the interval {start} - {end}")]
    OutOfBounds {
        time: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("offset {offset} cannot be anchored at the {anchor} of an interval")]
    InvalidOffset {
        offset: Duration,
        anchor: &'static str,
    },
}

/// A closed `[start, end]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, IntervalError> {
        if start > end {
            return Err(IntervalError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    Absolute(DateTime<Utc>),
    /// Non-negative offset added to the start of the reference window.
    FromStart(Duration),
    /// Non-positive offset added to the end of the reference window.
    FromEnd(Duration),
}

impl TimeBound {
    /// Archive convention: non-negative offsets count from the start, negative ones
    /// back from the end.
    pub fn signed(offset: Duration) -> Self {
        if offset >= Duration::zero() {
            TimeBound::FromStart(offset)
        } else {
            TimeBound::FromEnd(offset)
        }
    }

    fn check_sign(&self) -> Result<(), IntervalError> {
        match *self {
            TimeBound::FromStart(offset) if offset < Duration::zero() => {
                Err(IntervalError::InvalidOffset {
                    offset,
                    anchor: "start",
                })
            }
            TimeBound::FromEnd(offset) if offset > Duration::zero() => {
                Err(IntervalError::InvalidOffset {
                    offset,
                    anchor: "end",
                })
            }
            _ => Ok(()),
        }
    }

    pub fn resolve(&self, bounds: &Interval) -> Result<DateTime<Utc>, IntervalError> {
        self.check_sign()?;
        let time = match *self {
            TimeBound::Absolute(time) => time,
            TimeBound::FromStart(offset) => shift(bounds.start, offset, bounds)?,
            TimeBound::FromEnd(offset) => shift(bounds.end, offset, bounds)?,
        };

        if bounds.contains(time) {
            Ok(time)
        } else {
            Err(IntervalError::OutOfBounds {
                time,
                start: bounds.start,
                end: bounds.end,
            })
        }
    }
}

/// `anchor + offset`; an offset past the representable range is out of bounds.
fn shift(
    anchor: DateTime<Utc>,
    offset: Duration,
    bounds: &Interval,
) -> Result<DateTime<Utc>, IntervalError> {
    anchor
        .checked_add_signed(offset)
        .ok_or(IntervalError::OutOfBounds {
            time: if offset < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            },
            start: bounds.start,
            end: bounds.end,
        })
}

impl From<DateTime<Utc>> for TimeBound {
    fn from(time: DateTime<Utc>) -> Self {
        TimeBound::Absolute(time)
    }
}

/// Requested window; unset bounds default to the reference bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntervalRequest {
    pub start: Option<TimeBound>,
    pub end: Option<TimeBound>,
}

impl IntervalRequest {
    pub fn new(start: Option<TimeBound>, end: Option<TimeBound>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(TimeBound::Absolute(start)),
            end: Some(TimeBound::Absolute(end)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Reject requests that are invalid regardless of the reference window. Callers
    /// run this before touching the network.
    pub fn validate(&self) -> Result<(), IntervalError> {
        for bound in [self.start, self.end].iter().flatten() {
            bound.check_sign()?;
        }

        match (self.start, self.end) {
            (Some(TimeBound::Absolute(start)), Some(TimeBound::Absolute(end))) => {
                if start > end {
                    Err(IntervalError::Inverted { start, end })
                } else if start == end {
                    Err(IntervalError::Empty)
                } else {
                    Ok(())
                }
            }
            (Some(TimeBound::FromStart(start)), Some(TimeBound::FromStart(end)))
            | (Some(TimeBound::FromEnd(start)), Some(TimeBound::FromEnd(end))) => {
                if start > end {
                    Err(IntervalError::InvertedOffsets { start, end })
                } else if start == end {
                    Err(IntervalError::Empty)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    pub fn resolve(&self, bounds: &Interval) -> Result<Interval, IntervalError> {
        self.validate()?;

        let start = match &self.start {
            Some(bound) => bound.resolve(bounds)?,
            None => bounds.start,
        };
        let end = match &self.end {
            Some(bound) => bound.resolve(bounds)?,
            None => bounds.end,
        };

        if start > end {
            return Err(IntervalError::Inverted { start, end });
        }
        // a window that collapses to an instant is only acceptable when the reference is one
        if start == end && bounds.start != bounds.end {
            return Err(IntervalError::Empty);
        }

        Ok(Interval { start, end })
    }
}
