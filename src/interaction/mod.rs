//! Mode state machine tying the cutting pipeline to pointer input.
//!
//! [`Interaction`] owns the scene, the camera and all transient state (stroke,
//! running split, selection). Pointer events go through one dispatcher,
//! [`Interaction::handle_pointer`], which routes them by [`Mode`]. Every
//! failure is returned to the caller and also queued as a [`Notice`].

pub mod mode;
pub mod notice;
pub mod selection;

pub use mode::Mode;
pub use notice::Notice;
pub use selection::Selection;

use crate::boolean::{BooleanEvaluator, BspEvaluator};
use crate::config::CutConfig;
use crate::cutting::{
    AssembledParts, CuttingPlane, MapContext, PlaneIndicator, SplitJob, SplitProgress, assemble,
    map_pointer, solve,
};
use crate::errors::{ConfigError, CutError, CutSide};
use crate::float_types::{Real, tolerance};
use crate::io::{DownloadSink, ExportedPart, part_to_glb};
use crate::mesh::aabb_diagonal;
use crate::scene::{Camera, Material, NodeDesc, NodeId, Scene, Viewport};
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use tracing::{debug, info, warn};

/// Host collaborator asked before a frozen plane is cut.
pub trait CutConfirmation {
    fn confirm(&mut self, plane: &CuttingPlane) -> bool;
}

/// Confirms every cut.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl CutConfirmation for AlwaysConfirm {
    fn confirm(&mut self, _plane: &CuttingPlane) -> bool {
        true
    }
}

impl<F: FnMut(&CuttingPlane) -> bool> CutConfirmation for F {
    fn confirm(&mut self, plane: &CuttingPlane) -> bool {
        self(plane)
    }
}

/// Pointer input in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point2<Real>),
    Move(Point2<Real>),
    Up(Point2<Real>),
}

/// Result of committing a frozen plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The split job is running; drive it with [`Interaction::tick`].
    Started,
    /// The confirmation collaborator declined; nothing changed.
    Declined,
}

/// Result of one [`Interaction::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum TickStatus {
    /// No cut is running.
    Idle,
    Progress(SplitProgress),
    Completed(AssembledParts),
    /// The cut was rolled back; the model is unchanged.
    Failed(CutError),
}

#[derive(Debug, Clone, Copy)]
struct CutDrag {
    start_pixel: Point2<Real>,
    start: Point3<Real>,
    last: Point3<Real>,
}

#[derive(Debug, Clone, Copy)]
struct MoveDrag {
    part: NodeId,
    grab: Point3<Real>,
}

pub struct Interaction<E: BooleanEvaluator = BspEvaluator> {
    config: CutConfig,
    scene: Scene,
    camera: Camera,
    viewport: Viewport,
    evaluator: E,
    confirmation: Box<dyn CutConfirmation>,
    mode: Mode,
    model: Option<NodeId>,
    parts: Option<AssembledParts>,
    cut_count: u32,
    cut_drag: Option<CutDrag>,
    preview: Option<CuttingPlane>,
    frozen: Option<CuttingPlane>,
    job: Option<SplitJob>,
    selection: Selection,
    highlight: Material,
    move_drag: Option<MoveDrag>,
    notices: Vec<Notice>,
}

impl Interaction<BspEvaluator> {
    pub fn new(camera: Camera, viewport: Viewport, config: CutConfig) -> Result<Self, ConfigError> {
        Self::with_evaluator(camera, viewport, config, BspEvaluator)
    }
}

impl<E: BooleanEvaluator> Interaction<E> {
    pub fn with_evaluator(
        camera: Camera,
        viewport: Viewport,
        config: CutConfig,
        evaluator: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let highlight = Material::new("selection-highlight", config.highlight_color);
        Ok(Interaction {
            config,
            scene: Scene::new(),
            camera,
            viewport,
            evaluator,
            confirmation: Box::new(AlwaysConfirm),
            mode: Mode::View,
            model: None,
            parts: None,
            cut_count: 0,
            cut_drag: None,
            preview: None,
            frozen: None,
            job: None,
            selection: Selection::new(),
            highlight,
            move_drag: None,
            notices: Vec::new(),
        })
    }

    pub fn with_confirmation(mut self, confirmation: impl CutConfirmation + 'static) -> Self {
        self.confirmation = Box::new(confirmation);
        self
    }

    // ---------------------------------------------------------------- state

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn orbit_enabled(&self) -> bool {
        self.mode.orbit_enabled()
    }

    pub const fn config(&self) -> &CutConfig {
        &self.config
    }

    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Camera access for orbit controls.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.projection = self.camera.projection.with_aspect(viewport.aspect());
    }

    pub const fn model(&self) -> Option<NodeId> {
        self.model
    }

    pub const fn parts(&self) -> Option<&AssembledParts> {
        self.parts.as_ref()
    }

    pub const fn cut_count(&self) -> u32 {
        self.cut_count
    }

    pub const fn is_processing(&self) -> bool {
        self.job.is_some()
    }

    pub const fn selected_part(&self) -> Option<NodeId> {
        self.selection.selected()
    }

    pub const fn highlight_material(&self) -> &Material {
        &self.highlight
    }

    /// Take all queued notices, oldest first.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Plane of the stroke being drawn, for the live preview.
    pub fn preview(&self) -> Option<PlaneIndicator> {
        let plane = self.preview?;
        let diagonal = self
            .model
            .and_then(|m| self.scene.world_bounds(m))
            .map_or(1.0, |b| aabb_diagonal(&b));
        Some(PlaneIndicator::new(&plane, diagonal))
    }

    fn reported<T>(&mut self, result: Result<T, CutError>) -> Result<T, CutError> {
        if let Err(err) = &result {
            warn!(mode = %self.mode, error = %err, "interaction failed");
            self.notices.push(Notice::Error(err.clone()));
        }
        result
    }

    // ---------------------------------------------------------------- model

    /// Make `desc` the active model. Replaces any previous model or parts and
    /// resets the cut counter, the selection and the mode.
    pub fn load_model(&mut self, desc: NodeDesc) -> Result<NodeId, CutError> {
        let result = self.load_model_inner(desc);
        self.reported(result)
    }

    fn load_model_inner(&mut self, desc: NodeDesc) -> Result<NodeId, CutError> {
        if self.is_processing() {
            return Err(CutError::CutInProgress);
        }
        self.selection.forget();
        if let Some(model) = self.model.take() {
            self.scene.remove_subtree(model);
        }
        if let Some(parts) = self.parts.take() {
            for id in parts.ids() {
                self.scene.remove_subtree(id);
            }
        }

        let name = desc.name.clone();
        let id = self.scene.add_root(desc);
        self.model = Some(id);
        self.cut_count = 0;
        self.set_mode(Mode::View);
        info!(
            model = %name,
            meshes = self.scene.leaf_meshes(id).len(),
            "loaded model"
        );
        self.notices.push(Notice::Info(format!("loaded {name}")));
        Ok(id)
    }

    // ---------------------------------------------------------------- modes

    /// Switch modes. Entering `Cut` needs a loaded, uncut model; after a cut
    /// the request is rejected and the mode forced to `Move`.
    pub fn enter_mode(&mut self, target: Mode) -> Result<Mode, CutError> {
        let result = self.enter_mode_inner(target);
        self.reported(result)
    }

    fn enter_mode_inner(&mut self, target: Mode) -> Result<Mode, CutError> {
        if self.is_processing() && target != self.mode {
            return Err(CutError::ModeRejected {
                from: self.mode,
                to: target,
                reason: "a cut is in progress".to_string(),
            });
        }
        if target == Mode::Cut {
            if self.cut_count > 0 {
                self.set_mode(Mode::Move);
                return Err(CutError::OneCutOnly);
            }
            if self.model.is_none() {
                return Err(CutError::ModeRejected {
                    from: self.mode,
                    to: target,
                    reason: "no model is loaded".to_string(),
                });
            }
        }
        self.set_mode(target);
        Ok(self.mode)
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }
        if self.mode == Mode::Cut {
            self.cut_drag = None;
            self.preview = None;
            self.frozen = None;
        }
        if self.mode == Mode::Move {
            self.move_drag = None;
        }
        info!(from = %self.mode, to = %mode, "mode changed");
        self.mode = mode;
    }

    // ---------------------------------------------------------------- pointer

    /// Single entry point for pointer input.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<(), CutError> {
        let result = match (self.mode, event) {
            (Mode::View, _) => Ok(()),
            (Mode::Cut, PointerEvent::Down(p)) => self.cut_pointer_down(p),
            (Mode::Cut, PointerEvent::Move(p)) => self.cut_pointer_move(p),
            (Mode::Cut, PointerEvent::Up(p)) => self.cut_pointer_up(p),
            (Mode::Move, PointerEvent::Down(p)) => self.move_pointer_down(p),
            (Mode::Move, PointerEvent::Move(p)) => self.move_pointer_move(p),
            (Mode::Move, PointerEvent::Up(_)) => {
                self.move_drag = None;
                Ok(())
            },
        };
        self.reported(result)
    }

    fn map_context(&self, model: NodeId, previous: Option<Point3<Real>>) -> MapContext<'_> {
        MapContext {
            scene: &self.scene,
            camera: &self.camera,
            viewport: &self.viewport,
            model,
            previous,
        }
    }

    fn model_center(&self, model: NodeId) -> Result<Point3<Real>, CutError> {
        self.scene
            .world_bounds(model)
            .map(|b| b.center())
            .ok_or(CutError::NoModel)
    }

    fn cut_pointer_down(&mut self, pixel: Point2<Real>) -> Result<(), CutError> {
        if self.is_processing() {
            return Err(CutError::CutInProgress);
        }
        if self.cut_count > 0 {
            self.set_mode(Mode::Move);
            return Err(CutError::OneCutOnly);
        }
        let model = self.model.ok_or(CutError::NoModel)?;
        let start = map_pointer(&self.map_context(model, None), &pixel)?;
        debug!(x = start.x, y = start.y, z = start.z, "cut stroke started");
        self.cut_drag = Some(CutDrag {
            start_pixel: pixel,
            start,
            last: start,
        });
        self.preview = None;
        Ok(())
    }

    fn cut_pointer_move(&mut self, pixel: Point2<Real>) -> Result<(), CutError> {
        let (Some(mut drag), Some(model)) = (self.cut_drag, self.model) else {
            return Ok(());
        };
        match map_pointer(&self.map_context(model, Some(drag.last)), &pixel) {
            Ok(point) => drag.last = point,
            Err(err) => {
                debug!("cut stroke aborted");
                self.cut_drag = None;
                self.preview = None;
                return Err(err);
            },
        }
        self.cut_drag = Some(drag);
        if (pixel - drag.start_pixel).norm() >= self.config.min_drag_pixels {
            let center = self.model_center(model)?;
            self.preview = solve(&drag.start, &drag.last, &self.camera, &center, &self.config).ok();
        }
        Ok(())
    }

    fn cut_pointer_up(&mut self, pixel: Point2<Real>) -> Result<(), CutError> {
        if self.is_processing() {
            return Err(CutError::CutInProgress);
        }
        let (Some(drag), Some(model)) = (self.cut_drag.take(), self.model) else {
            return Ok(());
        };
        self.preview = None;
        if (pixel - drag.start_pixel).norm() < self.config.min_drag_pixels {
            debug!("ignoring short stroke");
            return Ok(());
        }
        let end = map_pointer(&self.map_context(model, Some(drag.last)), &pixel)?;
        let center = self.model_center(model)?;
        let plane = solve(&drag.start, &end, &self.camera, &center, &self.config)?;
        info!(
            nx = plane.normal.x,
            ny = plane.normal.y,
            nz = plane.normal.z,
            "cutting plane frozen"
        );
        self.frozen = Some(plane);
        self.perform_cut_inner().map(|_| ())
    }

    fn pick_part(&self, pixel: &Point2<Real>) -> Option<(NodeId, Point3<Real>)> {
        let parts = self.parts.as_ref()?;
        let ray = self.camera.ray_from_ndc(&self.viewport.to_ndc(pixel));
        parts
            .ids()
            .into_iter()
            .filter_map(|id| {
                self.scene
                    .ray_cast(id, &ray.origin, &ray.dir)
                    .map(|hit| (id, hit))
            })
            .min_by(|a, b| a.1.toi.total_cmp(&b.1.toi))
            .map(|(id, hit)| (id, hit.point))
    }

    fn move_pointer_down(&mut self, pixel: Point2<Real>) -> Result<(), CutError> {
        match self.pick_part(&pixel) {
            Some((part, grab)) => {
                self.selection.select(&mut self.scene, part, &self.highlight)?;
                self.move_drag = Some(MoveDrag { part, grab });
            },
            None => {
                self.selection.clear(&mut self.scene);
                self.move_drag = None;
            },
        }
        Ok(())
    }

    /// Drag the grabbed part on the camera-facing plane through the grab point.
    fn move_pointer_move(&mut self, pixel: Point2<Real>) -> Result<(), CutError> {
        let Some(mut drag) = self.move_drag else {
            return Ok(());
        };
        let ray = self.camera.ray_from_ndc(&self.viewport.to_ndc(&pixel));
        let normal = self.camera.view_direction();
        let denom = normal.dot(&ray.dir);
        if denom.abs() < tolerance() {
            return Ok(());
        }
        let t = normal.dot(&(drag.grab - ray.origin)) / denom;
        if t < 0.0 {
            return Ok(());
        }
        let target = ray.point_at(t);
        let delta: Vector3<Real> = target - drag.grab;
        let node = self
            .scene
            .node_mut(drag.part)
            .ok_or(CutError::MissingNode(drag.part))?;
        node.transform = Matrix4::new_translation(&delta) * node.transform;
        drag.grab = target;
        self.move_drag = Some(drag);
        Ok(())
    }

    /// Deselect the current part, restoring its materials.
    pub fn clear_selection(&mut self) {
        self.selection.clear(&mut self.scene);
    }

    /// Select a part by id, as if it had been clicked in `Move` mode.
    pub fn select_part(&mut self, part: NodeId) -> Result<(), CutError> {
        let result = if self.parts.as_ref().is_some_and(|p| p.get(part).is_some()) {
            self.selection.select(&mut self.scene, part, &self.highlight)
        } else {
            Err(CutError::MissingNode(part))
        };
        self.reported(result)
    }

    // ---------------------------------------------------------------- cut

    /// Commit the frozen plane: ask for confirmation, then start the split.
    pub fn perform_cut(&mut self) -> Result<CommitOutcome, CutError> {
        let result = self.perform_cut_inner();
        self.reported(result)
    }

    fn perform_cut_inner(&mut self) -> Result<CommitOutcome, CutError> {
        if self.is_processing() {
            return Err(CutError::CutInProgress);
        }
        if self.cut_count > 0 {
            self.frozen = None;
            self.set_mode(Mode::Move);
            return Err(CutError::OneCutOnly);
        }
        let model = self.model.ok_or(CutError::NoModel)?;
        let plane = self.frozen.take().ok_or(CutError::NoCuttingPlane)?;

        self.notices.push(Notice::ConfirmationRequested);
        if !self.confirmation.confirm(&plane) {
            info!("cut declined");
            self.notices.push(Notice::Info("cut cancelled".to_string()));
            return Ok(CommitOutcome::Declined);
        }

        let job = SplitJob::new(&self.scene, model, plane, &self.config)?;
        info!(meshes = job.progress().total, "cut started");
        self.job = Some(job);
        Ok(CommitOutcome::Started)
    }

    /// Advance a running cut by one chunk. Call once per frame.
    pub fn tick(&mut self) -> TickStatus {
        let Some(job) = self.job.as_mut() else {
            return TickStatus::Idle;
        };
        let progress = job.step(&self.evaluator);
        self.notices.push(Notice::Progress(progress.percent()));
        debug!(
            processed = progress.processed,
            total = progress.total,
            "split progress"
        );
        if !job.is_done() {
            return TickStatus::Progress(progress);
        }

        let Some(job) = self.job.take() else {
            return TickStatus::Idle;
        };
        let output = job.finish();
        for (node, err) in &output.skipped {
            let name = self
                .scene
                .node(*node)
                .map_or_else(|| format!("{node:?}"), |n| n.name.clone());
            self.notices
                .push(Notice::Warning(format!("skipped {name}: {err}")));
        }

        match assemble(&mut self.scene, &output, &self.config) {
            Ok(parts) => {
                self.cut_count += 1;
                self.model = None;
                self.selection.forget();
                self.parts = Some(parts.clone());
                self.set_mode(Mode::Move);
                info!(
                    part_a = parts.a.id.index(),
                    part_b = parts.b.id.index(),
                    "cut completed"
                );
                self.notices.push(Notice::CutCompleted {
                    part_a: parts.a.id,
                    part_b: parts.b.id,
                });
                TickStatus::Completed(parts)
            },
            Err(err) => {
                warn!(error = %err, "cut rolled back");
                self.notices.push(Notice::Error(err.clone()));
                TickStatus::Failed(err)
            },
        }
    }

    /// Tick until the running cut (if any) completes or fails.
    pub fn finish_cut(&mut self) -> TickStatus {
        loop {
            match self.tick() {
                TickStatus::Progress(_) => continue,
                status => return status,
            }
        }
    }

    // ---------------------------------------------------------------- export

    /// Serialize the selected part as binary glTF.
    pub fn export_selected_part(&mut self) -> Result<ExportedPart, CutError> {
        let result = self.export_inner();
        self.reported(result)
    }

    fn export_inner(&self) -> Result<ExportedPart, CutError> {
        let part = self.selection.selected().ok_or(CutError::NoSelection)?;
        let bytes = part_to_glb(&self.scene, part, self.selection.saved_materials())?;
        let suffix = match self.parts.as_ref().and_then(|p| p.get(part)).map(|p| p.side) {
            Some(CutSide::Subtraction) => "a",
            Some(CutSide::Intersection) => "b",
            None => "part",
        };
        let file_name = format!("{}-{suffix}.glb", self.config.export_name);
        info!(file = %file_name, bytes = bytes.len(), "exported part");
        Ok(ExportedPart { file_name, bytes })
    }

    /// Export the selected part and hand it to `sink`.
    pub fn export_and_offer(&mut self, sink: &mut dyn DownloadSink) -> Result<(), CutError> {
        let exported = self.export_selected_part()?;
        sink.offer(&exported);
        self.notices
            .push(Notice::Info(format!("exported {}", exported.file_name)));
        Ok(())
    }
}
