//! Render pass types.

use std::fmt;

use crate::types::{Extent3d, QueueType, RenderArea};

use super::attachment::{BufferUseHandle, ImageUseHandle};
use super::command::CommandList;

/// Callback that records a pass's commands each time the pass executes.
pub type PassRecorder = Box<dyn FnMut(&mut CommandList) + Send>;

/// A pass in the render graph.
///
/// Passes describe units of GPU work on one queue together with the
/// attachment uses they declare. A graphics pass with render or depth
/// targets has a render extent taken from its first target.
pub struct Pass {
    name: String,
    queue: QueueType,
    image_uses: Vec<ImageUseHandle>,
    buffer_uses: Vec<BufferUseHandle>,
    depth_stencil: Option<ImageUseHandle>,
    targets: Vec<(ImageUseHandle, Extent3d)>,
    render_area: Option<RenderArea>,
    recorder: Option<PassRecorder>,
    command_lists: Vec<CommandList>,
}

impl Pass {
    pub(crate) fn new(name: String, queue: QueueType) -> Self {
        Self {
            name,
            queue,
            image_uses: Vec::new(),
            buffer_uses: Vec::new(),
            depth_stencil: None,
            targets: Vec::new(),
            render_area: None,
            recorder: None,
            command_lists: Vec::new(),
        }
    }

    /// Get the pass name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue the pass executes on.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Check if this is a graphics pass.
    pub fn is_graphics(&self) -> bool {
        self.queue == QueueType::Graphics
    }

    /// Check if this is a compute pass.
    pub fn is_compute(&self) -> bool {
        self.queue == QueueType::Compute
    }

    /// Check if this is a transfer pass.
    pub fn is_transfer(&self) -> bool {
        self.queue == QueueType::Transfer
    }

    /// Image uses in declaration order.
    pub fn image_uses(&self) -> &[ImageUseHandle] {
        &self.image_uses
    }

    /// Buffer uses in declaration order.
    pub fn buffer_uses(&self) -> &[BufferUseHandle] {
        &self.buffer_uses
    }

    /// The depth/stencil use, if any.
    pub fn depth_stencil(&self) -> Option<ImageUseHandle> {
        self.depth_stencil
    }

    /// Extent shared by all render and depth targets.
    pub fn render_extent(&self) -> Option<Extent3d> {
        self.targets.first().map(|&(_, extent)| extent)
    }

    /// Area draws are confined to: the explicit area if set, otherwise the
    /// whole render extent.
    pub fn render_area(&self) -> Option<RenderArea> {
        self.render_area.or_else(|| {
            self.render_extent()
                .map(|extent| RenderArea::from_dimensions(extent.width, extent.height))
        })
    }

    /// Pre-recorded command lists, executed after the recorder.
    pub fn command_lists(&self) -> &[CommandList] {
        &self.command_lists
    }

    /// Returns true if a recording callback is installed.
    pub fn has_recorder(&self) -> bool {
        self.recorder.is_some()
    }

    pub(crate) fn push_image_use(
        &mut self,
        handle: ImageUseHandle,
        target_extent: Option<Extent3d>,
        depth_stencil: bool,
    ) {
        self.image_uses.push(handle);
        if let Some(extent) = target_extent {
            self.targets.push((handle, extent));
        }
        if depth_stencil {
            self.depth_stencil = Some(handle);
        }
    }

    pub(crate) fn push_buffer_use(&mut self, handle: BufferUseHandle) {
        self.buffer_uses.push(handle);
    }

    /// Forget an image use. Returns false if the pass did not declare it.
    pub(crate) fn remove_image_use(&mut self, handle: ImageUseHandle) -> bool {
        let Some(position) = self.image_uses.iter().position(|&h| h == handle) else {
            return false;
        };
        self.image_uses.remove(position);
        self.targets.retain(|&(h, _)| h != handle);
        if self.depth_stencil == Some(handle) {
            self.depth_stencil = None;
        }
        if self.targets.is_empty() {
            self.render_area = None;
        }
        true
    }

    /// Forget a buffer use. Returns false if the pass did not declare it.
    pub(crate) fn remove_buffer_use(&mut self, handle: BufferUseHandle) -> bool {
        let Some(position) = self.buffer_uses.iter().position(|&h| h == handle) else {
            return false;
        };
        self.buffer_uses.remove(position);
        true
    }

    pub(crate) fn set_render_area(&mut self, area: RenderArea) {
        self.render_area = Some(area);
    }

    pub(crate) fn set_recorder(&mut self, recorder: PassRecorder) {
        self.recorder = Some(recorder);
    }

    pub(crate) fn push_command_list(&mut self, list: CommandList) {
        self.command_lists.push(list);
    }

    /// Run the recorder, if any, into `list`.
    pub(crate) fn record(&mut self, list: &mut CommandList) {
        if let Some(recorder) = &mut self.recorder {
            recorder(list);
        }
    }
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("image_uses", &self.image_uses.len())
            .field("buffer_uses", &self.buffer_uses.len())
            .field("render_extent", &self.render_extent())
            .field("has_recorder", &self.recorder.is_some())
            .field("command_lists", &self.command_lists.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::command::DrawCommand;
    use ember_core::Handle;

    #[test]
    fn test_render_area_defaults_to_extent() {
        let mut pass = Pass::new("main".into(), QueueType::Graphics);
        assert!(pass.render_area().is_none());

        pass.push_image_use(Handle::new(0, 1), Some(Extent3d::new_2d(320, 240)), false);
        assert_eq!(pass.render_area(), Some(RenderArea::from_dimensions(320, 240)));

        pass.set_render_area(RenderArea::new(10, 10, 100, 100));
        assert_eq!(pass.render_area(), Some(RenderArea::new(10, 10, 100, 100)));
    }

    #[test]
    fn test_remove_depth_use() {
        let mut pass = Pass::new("shadow".into(), QueueType::Graphics);
        let depth = Handle::new(3, 1);
        pass.push_image_use(depth, Some(Extent3d::new_2d(1024, 1024)), true);
        assert_eq!(pass.depth_stencil(), Some(depth));

        assert!(pass.remove_image_use(depth));
        assert!(pass.depth_stencil().is_none());
        assert!(pass.render_extent().is_none());
        assert!(!pass.remove_image_use(depth));
    }

    #[test]
    fn test_recorder_runs() {
        let mut pass = Pass::new("draw".into(), QueueType::Graphics);
        pass.set_recorder(Box::new(|list| list.submit(DrawCommand::new(3))));
        let mut list = CommandList::new(QueueType::Graphics);
        pass.record(&mut list);
        pass.record(&mut list);
        assert_eq!(list.len(), 2);
    }
}
