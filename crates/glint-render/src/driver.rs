//! Frame sequencing.
//!
//! [`FrameDriver`] owns the order of operations for one frame: wait on
//! the slot's fence, acquire an image, record, submit, present, and
//! decide whether the presentation resources need recreating. It talks
//! to the GPU only through [`FramePort`], so the sequencing rules can
//! be exercised against a scripted port with no device present.

use glint_gpu::{AcquireOutcome, PresentOutcome, Result};

/// The GPU-facing operations one frame needs, in the order the driver
/// calls them.
pub trait FramePort {
    /// Block until the slot's previous submission has finished.
    fn wait_for_slot(&mut self, slot: usize) -> Result<()>;

    /// Request the next presentable image, signaling the slot's
    /// image-available semaphore.
    fn acquire(&mut self, slot: usize) -> Result<AcquireOutcome>;

    /// Reset the slot's fence and command buffer for re-recording.
    ///
    /// Called only once an image is in hand; a retired acquire must
    /// leave the fence signaled so the next wait on this slot returns
    /// immediately.
    fn begin_recording(&mut self, slot: usize) -> Result<()>;

    /// Write this frame's transforms into the slot's uniform buffer.
    fn update_transform(&mut self, slot: usize) -> Result<()>;

    /// Record the slot's command buffer against the acquired image.
    fn record(&mut self, slot: usize, image_index: u32) -> Result<()>;

    /// Submit the slot's command buffer, fencing on the slot.
    fn submit(&mut self, slot: usize) -> Result<()>;

    /// Present the acquired image.
    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;

    /// Tear down and rebuild the presentation resources.
    fn recreate_presentation(&mut self) -> Result<()>;

    /// Consume a pending external resize notification.
    fn take_resize_request(&mut self) -> bool;
}

/// What happened to one driven frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted and queued for display.
    Presented,
    /// The acquire retired; nothing was submitted or presented, the
    /// presentation resources were recreated, and the slot will be
    /// retried next frame.
    SkippedRetire,
}

/// Drives frames through a [`FramePort`], rotating over the resource
/// ring's slots.
#[derive(Clone, Copy)]
pub struct FrameDriver {
    current_slot: usize,
    slot_count: usize,
}

impl FrameDriver {
    /// Create a driver over a ring of `slot_count` slots.
    pub fn new(slot_count: usize) -> Self {
        debug_assert!(slot_count > 0);
        Self {
            current_slot: 0,
            slot_count,
        }
    }

    /// Slot the next frame will use.
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Drive one frame.
    ///
    /// A retired acquire skips the frame without advancing the slot:
    /// the fence is still signaled, so retrying the same slot after
    /// recreation is free. Recreation after present covers out-of-date
    /// and suboptimal results plus any external resize notification,
    /// whichever arrives first.
    pub fn drive<P: FramePort>(&mut self, port: &mut P) -> Result<FrameOutcome> {
        let slot = self.current_slot;

        port.wait_for_slot(slot)?;

        let (image_index, suboptimal) = match port.acquire(slot)? {
            AcquireOutcome::Ready {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::Retire => {
                port.recreate_presentation()?;
                return Ok(FrameOutcome::SkippedRetire);
            }
        };

        port.begin_recording(slot)?;
        port.update_transform(slot)?;
        port.record(slot, image_index)?;
        port.submit(slot)?;

        let present_outcome = port.present(slot, image_index)?;

        let needs_recreate = matches!(
            present_outcome,
            PresentOutcome::Retire | PresentOutcome::RetireSoft
        ) || suboptimal
            || port.take_resize_request();

        if needs_recreate {
            port.recreate_presentation()?;
        }

        self.current_slot = (self.current_slot + 1) % self.slot_count;
        Ok(FrameOutcome::Presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Begin(usize),
        Update(usize),
        Record(usize, u32),
        Submit(usize),
        Present(usize, u32),
        Recreate,
    }

    /// Scripted port: acquire and present outcomes are dequeued per
    /// call, defaulting to the happy path when the script runs dry.
    struct ScriptedPort {
        calls: Vec<Call>,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<PresentOutcome>,
        resize_requested: bool,
        next_image: u32,
    }

    impl ScriptedPort {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                resize_requested: false,
                next_image: 0,
            }
        }

        fn recreations(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Recreate).count()
        }

        fn count<F: Fn(&Call) -> bool>(&self, f: F) -> usize {
            self.calls.iter().filter(|c| f(c)).count()
        }
    }

    impl FramePort for ScriptedPort {
        fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Wait(slot));
            Ok(())
        }

        fn acquire(&mut self, slot: usize) -> Result<AcquireOutcome> {
            self.calls.push(Call::Acquire(slot));
            Ok(self.acquire_script.pop_front().unwrap_or_else(|| {
                let image_index = self.next_image;
                self.next_image = (self.next_image + 1) % 3;
                AcquireOutcome::Ready {
                    image_index,
                    suboptimal: false,
                }
            }))
        }

        fn begin_recording(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Begin(slot));
            Ok(())
        }

        fn update_transform(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Update(slot));
            Ok(())
        }

        fn record(&mut self, slot: usize, image_index: u32) -> Result<()> {
            self.calls.push(Call::Record(slot, image_index));
            Ok(())
        }

        fn submit(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Submit(slot));
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
            self.calls.push(Call::Present(slot, image_index));
            Ok(self
                .present_script
                .pop_front()
                .unwrap_or(PresentOutcome::Presented))
        }

        fn recreate_presentation(&mut self) -> Result<()> {
            self.calls.push(Call::Recreate);
            Ok(())
        }

        fn take_resize_request(&mut self) -> bool {
            std::mem::take(&mut self.resize_requested)
        }
    }

    #[test]
    fn steady_state_alternates_slots() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();

        let mut slots = Vec::new();
        for _ in 0..10 {
            slots.push(driver.current_slot());
            let outcome = driver.drive(&mut port).unwrap();
            assert_eq!(outcome, FrameOutcome::Presented);
        }

        assert_eq!(slots, vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(port.recreations(), 0);
    }

    #[test]
    fn slot_zero_reused_exactly_twice_after_three_frames() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();

        for _ in 0..3 {
            driver.drive(&mut port).unwrap();
        }

        assert_eq!(port.count(|c| matches!(c, Call::Wait(0))), 2);
        assert_eq!(port.count(|c| matches!(c, Call::Record(0, _))), 2);
        assert_eq!(port.count(|c| matches!(c, Call::Wait(1))), 1);
    }

    #[test]
    fn frame_operations_run_in_order() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();

        driver.drive(&mut port).unwrap();

        assert_eq!(
            port.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::Begin(0),
                Call::Update(0),
                Call::Record(0, 0),
                Call::Submit(0),
                Call::Present(0, 0),
            ]
        );
    }

    #[test]
    fn transform_write_happens_only_after_wait() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();

        for _ in 0..6 {
            driver.drive(&mut port).unwrap();
        }

        // Every update to a slot must be preceded by a wait on that
        // same slot with no intervening update.
        for (i, call) in port.calls.iter().enumerate() {
            if let Call::Update(slot) = call {
                let waited = port.calls[..i]
                    .iter()
                    .rev()
                    .find_map(|c| match c {
                        Call::Wait(s) => Some(s == slot),
                        Call::Update(_) => Some(false),
                        _ => None,
                    })
                    .unwrap_or(false);
                assert!(waited, "update of slot {slot} without a prior wait");
            }
        }
    }

    #[test]
    fn retired_acquire_skips_submission_and_keeps_slot() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();
        port.acquire_script.push_back(AcquireOutcome::Retire);

        let outcome = driver.drive(&mut port).unwrap();

        assert_eq!(outcome, FrameOutcome::SkippedRetire);
        assert_eq!(port.count(|c| matches!(c, Call::Submit(_))), 0);
        assert_eq!(port.count(|c| matches!(c, Call::Present(_, _))), 0);
        assert_eq!(port.count(|c| matches!(c, Call::Begin(_))), 0);
        assert_eq!(port.recreations(), 1);
        // The slot is retried, not skipped.
        assert_eq!(driver.current_slot(), 0);
    }

    #[test]
    fn recovers_after_mid_run_retire() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();

        // Frames 0..4 succeed; the fifth acquire retires.
        for _ in 0..4 {
            port.acquire_script.push_back(AcquireOutcome::Ready {
                image_index: 0,
                suboptimal: false,
            });
        }
        port.acquire_script.push_back(AcquireOutcome::Retire);

        let mut outcomes = Vec::new();
        for _ in 0..6 {
            outcomes.push(driver.drive(&mut port).unwrap());
        }

        assert_eq!(
            outcomes,
            vec![
                FrameOutcome::Presented,
                FrameOutcome::Presented,
                FrameOutcome::Presented,
                FrameOutcome::Presented,
                FrameOutcome::SkippedRetire,
                FrameOutcome::Presented,
            ]
        );

        // The retired frame targeted slot 0 and the recovery frame
        // reused it.
        assert_eq!(port.calls.iter().filter(|c| **c == Call::Wait(0)).count(), 4);
        assert_eq!(port.recreations(), 1);
        assert_eq!(driver.current_slot(), 1);
    }

    #[test]
    fn out_of_date_present_triggers_recreation_after_presenting() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();
        port.present_script.push_back(PresentOutcome::Retire);

        let outcome = driver.drive(&mut port).unwrap();

        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(port.recreations(), 1);
        // Recreation comes after present, and the slot advances.
        assert_eq!(port.calls.last(), Some(&Call::Recreate));
        assert_eq!(driver.current_slot(), 1);
    }

    #[test]
    fn suboptimal_present_triggers_recreation() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();
        port.present_script.push_back(PresentOutcome::RetireSoft);

        driver.drive(&mut port).unwrap();
        assert_eq!(port.recreations(), 1);
    }

    #[test]
    fn suboptimal_acquire_presents_then_recreates() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();
        port.acquire_script.push_back(AcquireOutcome::Ready {
            image_index: 1,
            suboptimal: true,
        });

        let outcome = driver.drive(&mut port).unwrap();

        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(port.count(|c| matches!(c, Call::Present(_, 1))), 1);
        assert_eq!(port.recreations(), 1);
    }

    #[test]
    fn external_resize_triggers_recreation_after_present() {
        let mut driver = FrameDriver::new(2);
        let mut port = ScriptedPort::new();
        port.resize_requested = true;

        driver.drive(&mut port).unwrap();

        assert_eq!(port.recreations(), 1);
        assert_eq!(port.calls.last(), Some(&Call::Recreate));

        // The request is consumed; the next frame is clean.
        driver.drive(&mut port).unwrap();
        assert_eq!(port.recreations(), 1);
    }

    #[test]
    fn slot_rotation_wraps_for_larger_rings() {
        let mut driver = FrameDriver::new(3);
        let mut port = ScriptedPort::new();

        let mut slots = Vec::new();
        for _ in 0..7 {
            slots.push(driver.current_slot());
            driver.drive(&mut port).unwrap();
        }

        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
    }
}
