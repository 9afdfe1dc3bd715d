//! Bevy integration: pump the frame queue from the `Update` schedule

use std::rc::Rc;

use bevy::prelude::*;

use crate::animation::{FrameQueue, FrameScheduler};

/// Frame queue animating effect sessions. NonSend since sessions are
/// single-threaded.
#[derive(Debug, Default)]
pub struct FrameQueueResource {
    queue: Rc<FrameQueue>,
}

impl FrameQueueResource {
    pub fn queue(&self) -> Rc<FrameQueue> {
        Rc::clone(&self.queue)
    }

    /// Scheduler handle for [`crate::EffectSession::new`]
    pub fn scheduler(&self) -> Rc<dyn FrameScheduler> {
        self.queue()
    }
}

pub struct HolographicFramePlugin;

impl Plugin for HolographicFramePlugin {
    fn build(&self, app: &mut App) {
        app.world_mut()
            .insert_non_send_resource(FrameQueueResource::default());
        app.add_systems(Update, pump_frame_queue);
    }
}

fn pump_frame_queue(frames: Option<NonSend<FrameQueueResource>>) {
    let Some(frames) = frames else {
        return;
    };
    frames.queue.run_frame();
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_update_runs_queued_frames() {
        let mut app = App::new();
        app.add_plugins(HolographicFramePlugin);

        let queue = app.world().non_send_resource::<FrameQueueResource>().queue();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        queue.request_frame(Box::new(move || counter.set(counter.get() + 1)));

        app.update();
        assert_eq!(hits.get(), 1);
        assert_eq!(queue.pending_len(), 0);
    }
}
