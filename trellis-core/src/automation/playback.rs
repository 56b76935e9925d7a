//! Real-time playback of a curve.
//!
//! The cursor caches the index of the next node in the direction of travel
//! and the number of samples until it is reached, so ticking never searches.
//! Between nodes an interpolating segment is played as a sample-based ramp.

use trellis_types::Pos;

use super::{interpolate, AutomationCurve};

/// Whether live user input is currently overriding recorded automation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverrideState {
    #[default]
    Off,
    /// Hold the user's value until the next node is reached.
    Latched,
    /// Hold the user's value for this many more samples.
    Holding { remaining: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    start: i32,
    target: i32,
    elapsed: u64,
    total: u64,
}

impl Ramp {
    fn value(&self) -> i32 {
        interpolate(
            self.start,
            self.target,
            self.elapsed.min(self.total) as i64,
            self.total as i64,
        )
    }
}

#[derive(Debug, Clone)]
pub(super) struct PlaybackCursor {
    /// Last whole tick passed
    pos: Pos,
    sample_in_tick: u64,
    samples_per_tick: u64,
    loop_length: i32,
    reversed: bool,
    /// Next node in the direction of travel; `None` while unautomated
    next: Option<usize>,
    ramp: Option<Ramp>,
}

impl PlaybackCursor {
    fn ticks_until(&self, node_pos: Pos) -> i64 {
        let mut distance = if self.reversed {
            self.pos - node_pos
        } else {
            node_pos - self.pos
        };
        if distance <= 0 {
            distance += self.loop_length;
        }
        i64::from(distance)
    }

    fn samples_until(&self, node_pos: Pos) -> u64 {
        (self.ticks_until(node_pos) as u64 * self.samples_per_tick).saturating_sub(self.sample_in_tick)
    }

    fn advance(&mut self, samples: u64) {
        let total = self.sample_in_tick + samples;
        self.sample_in_tick = total % self.samples_per_tick;
        let ticks = ((total / self.samples_per_tick) % self.loop_length as u64) as i32;
        self.pos = if self.reversed {
            (self.pos - ticks).rem_euclid(self.loop_length)
        } else {
            (self.pos + ticks).rem_euclid(self.loop_length)
        };
    }
}

impl AutomationCurve {
    /// Start (or jump) playback at `pos`.
    pub fn set_play_pos(&mut self, pos: Pos, loop_length: i32, reversed: bool, samples_per_tick: u32) {
        let loop_length = loop_length.max(1);
        self.cursor = Some(PlaybackCursor {
            pos: pos.rem_euclid(loop_length),
            sample_in_tick: 0,
            samples_per_tick: u64::from(samples_per_tick.max(1)),
            loop_length,
            reversed,
            next: None,
            ramp: None,
        });
        self.override_state = OverrideState::Off;
        self.resync_cursor();
    }

    pub fn stop_playback(&mut self) {
        self.cursor = None;
        self.override_state = OverrideState::Off;
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn play_pos(&self) -> Option<Pos> {
        self.cursor.as_ref().map(|c| c.pos)
    }

    pub fn override_state(&self) -> OverrideState {
        self.override_state
    }

    /// Recompute the cached next node and ramp after the nodes changed or
    /// the cursor jumped. Also resolves `current_value` unless overriding.
    pub(super) fn resync_cursor(&mut self) {
        let Some(mut cursor) = self.cursor.take() else {
            return;
        };
        cursor.next = None;
        cursor.ramp = None;

        let n = self.nodes.len();
        if n > 0 {
            let overriding = self.override_state != OverrideState::Off;
            if !overriding {
                self.current_value = self.value_at_pos(cursor.pos, cursor.loop_length, cursor.reversed);
            }

            let (next, ramps) = if cursor.reversed {
                let next = self.nodes.search_geq(cursor.pos).checked_sub(1).unwrap_or(n - 1);
                (next, self.nodes[next].interpolated)
            } else {
                let mut next = self.nodes.search_geq(cursor.pos + 1);
                if next >= n {
                    next = 0;
                }
                (next, self.nodes[self.prev_index(next)].interpolated)
            };

            cursor.next = Some(next);
            if ramps && !overriding {
                cursor.ramp = Some(Ramp {
                    start: self.current_value,
                    target: self.nodes[next].value,
                    elapsed: 0,
                    total: cursor.samples_until(self.nodes[next].pos),
                });
            }
        }

        self.cursor = Some(cursor);
    }

    fn arrive_at_node(&mut self, cursor: &mut PlaybackCursor, i: usize) {
        if self.override_state == OverrideState::Latched {
            self.override_state = OverrideState::Off;
        }
        let overriding = self.override_state != OverrideState::Off;
        let node = self.nodes[i];
        cursor.ramp = None;

        if cursor.reversed {
            let next = self.prev_index(i);
            let left = self.nodes[next];
            cursor.next = Some(next);
            if left.interpolated {
                if !overriding {
                    self.current_value = node.value;
                    cursor.ramp = Some(Ramp {
                        start: node.value,
                        target: left.value,
                        elapsed: 0,
                        total: cursor.samples_until(left.pos),
                    });
                }
            } else if !overriding {
                self.current_value = left.value;
            }
        } else {
            let next = if i + 1 == self.nodes.len() { 0 } else { i + 1 };
            cursor.next = Some(next);
            if !overriding {
                self.current_value = node.value;
                if node.interpolated {
                    let target = self.nodes[next];
                    cursor.ramp = Some(Ramp {
                        start: node.value,
                        target: target.value,
                        elapsed: 0,
                        total: cursor.samples_until(target.pos),
                    });
                }
            }
        }

        log::trace!(target: "automation", "reached node {} at {}", i, node.pos);
    }

    fn advance_samples(&mut self, samples: u64) -> bool {
        let Some(mut cursor) = self.cursor.take() else {
            return false;
        };
        let old_value = self.current_value;

        let mut hold_expired = false;
        if let OverrideState::Holding { remaining } = &mut self.override_state {
            if *remaining <= samples {
                hold_expired = true;
            } else {
                *remaining -= samples;
            }
        }

        let mut remaining = samples;
        while let Some(next_i) = cursor.next {
            let node_pos = self.nodes[next_i].pos;
            let to_next = cursor.samples_until(node_pos);
            if remaining < to_next {
                cursor.advance(remaining);
                if let Some(ramp) = cursor.ramp.as_mut() {
                    ramp.elapsed += remaining;
                    if self.override_state == OverrideState::Off {
                        self.current_value = ramp.value();
                    }
                }
                break;
            }

            remaining -= to_next;
            cursor.pos = node_pos;
            cursor.sample_in_tick = 0;
            self.arrive_at_node(&mut cursor, next_i);
            if remaining == 0 {
                break;
            }

            // Whole loops bring the cursor back to this very node
            let loop_samples = cursor.loop_length as u64 * cursor.samples_per_tick;
            remaining %= loop_samples;
        }
        if cursor.next.is_none() {
            cursor.advance(remaining);
        }

        self.cursor = Some(cursor);
        if hold_expired {
            self.override_state = OverrideState::Off;
            self.resync_cursor();
        }

        self.current_value != old_value
    }

    /// Advance playback by `num_samples`. Returns whether `current_value` changed.
    pub fn tick_samples(&mut self, num_samples: u32) -> bool {
        self.advance_samples(u64::from(num_samples))
    }

    /// Advance playback by whole ticks.
    pub fn tick_ticks(&mut self, num_ticks: u32) -> bool {
        let samples_per_tick = self.cursor.as_ref().map_or(1, |c| c.samples_per_tick);
        self.advance_samples(u64::from(num_ticks) * samples_per_tick)
    }

    /// Playback direction flipped at a ping-pong loop point.
    pub fn notify_pingpong(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.reversed = !cursor.reversed;
        }
        self.resync_cursor();
    }

    /// The user turned a knob. While automated playback is running, the new
    /// value wins for `hold_samples`, or until the next node if `latch`.
    pub fn set_current_value_from_user(&mut self, value: i32, hold_samples: u32, latch: bool) {
        self.current_value = value;
        if self.is_automated() {
            if let Some(cursor) = self.cursor.as_mut() {
                cursor.ramp = None;
                self.override_state = if latch {
                    OverrideState::Latched
                } else {
                    OverrideState::Holding {
                        remaining: u64::from(hold_samples),
                    }
                };
            }
        }
    }

    pub fn cancel_overriding(&mut self) {
        if self.override_state == OverrideState::Off {
            return;
        }
        self.override_state = OverrideState::Off;
        self.resync_cursor();
    }
}
