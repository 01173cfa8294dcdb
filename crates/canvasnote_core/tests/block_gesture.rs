use canvasnote_core::geometry::Camera;
use canvasnote_core::gesture::{
    hit_test, BlockGesture, CanvasAction, GestureConfig, GestureInput, GestureState, HitTarget,
    ListenerEffect, PointerButton,
};
use canvasnote_core::model::block::{Block, BlockMode};
use canvasnote_core::{CanvasState, Concept, Content, Settings};
use glam::Vec2;
use uuid::Uuid;

fn down(button: PointerButton, x: f32, y: f32, target: HitTarget) -> GestureInput {
    GestureInput::PointerDown {
        button,
        position: Vec2::new(x, y),
        target,
    }
}

fn pointer_move(x: f32, y: f32) -> GestureInput {
    GestureInput::PointerMove {
        position: Vec2::new(x, y),
    }
}

fn up(x: f32, y: f32) -> GestureInput {
    GestureInput::PointerUp {
        button: PointerButton::Primary,
        position: Vec2::new(x, y),
    }
}

/// Feeds inputs with a fixed external mode and records every action.
fn run(
    gesture: &mut BlockGesture,
    mode: BlockMode,
    inputs: &[GestureInput],
) -> Vec<CanvasAction> {
    let mut actions = Vec::new();
    let mut sink = |action: CanvasAction| actions.push(action);
    for input in inputs {
        gesture.handle(*input, mode, &mut sink);
    }
    actions
}

/// Feeds inputs into a canvas, reading the block mode back before each one.
fn drive(canvas: &mut CanvasState, gesture: &mut BlockGesture, inputs: &[GestureInput]) {
    for input in inputs {
        let mode = canvas.block_mode(gesture.block_id());
        gesture.handle(*input, mode, canvas);
    }
}

fn canvas_with(blocks: &[Block], camera: Camera) -> CanvasState {
    let mut home = Concept::new(Content::text("home"));
    for block in blocks {
        home.add_block(block.clone());
    }
    CanvasState::from_concept(&home, camera, Vec2::new(800.0, 600.0))
}

#[test]
fn small_moves_never_start_a_drag() {
    let block_id = Uuid::new_v4();
    let mut gesture = BlockGesture::new(block_id, &GestureConfig::default());

    let actions = run(
        &mut gesture,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 10.0, 10.0, HitTarget::Body),
            pointer_move(12.0, 11.0),
            pointer_move(13.0, 10.0),
            pointer_move(10.0, 7.0),
        ],
    );

    assert!(actions.is_empty());
    assert_eq!(
        gesture.state(),
        GestureState::ReadyToMove {
            origin: Vec2::new(10.0, 10.0)
        }
    );
    assert!(gesture.is_listening());
}

#[test]
fn drag_emits_start_then_moves_then_end() {
    let block_id = Uuid::new_v4();
    let mut gesture = BlockGesture::new(block_id, &GestureConfig::default());

    let mut actions = run(
        &mut gesture,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 10.0, 10.0, HitTarget::Body),
            pointer_move(20.0, 10.0),
        ],
    );
    actions.extend(run(
        &mut gesture,
        BlockMode::Moving,
        &[pointer_move(25.0, 12.0), up(25.0, 12.0)],
    ));

    assert_eq!(
        actions,
        vec![
            CanvasAction::BlockMoveStart {
                block_id,
                position: Vec2::new(20.0, 10.0)
            },
            CanvasAction::BlockMove {
                block_id,
                position: Vec2::new(25.0, 12.0)
            },
            CanvasAction::BlockSetMode {
                block_id,
                mode: BlockMode::Moving
            },
            CanvasAction::BlockMoveEnd { block_id },
            CanvasAction::BlockSetMode {
                block_id,
                mode: BlockMode::Idle
            },
        ]
    );
    assert!(!gesture.is_listening());
}

#[test]
fn single_axis_resize_zeroes_the_other_axis() {
    let block_id = Uuid::new_v4();
    let mut width = BlockGesture::new(block_id, &GestureConfig::default());
    let mut height = BlockGesture::new(block_id, &GestureConfig::default());

    let width_actions = run(
        &mut width,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 50.0, 25.0, HitTarget::ResizeWidth),
            pointer_move(60.0, 40.0),
        ],
    );
    let height_actions = run(
        &mut height,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 25.0, 50.0, HitTarget::ResizeHeight),
            pointer_move(40.0, 56.0),
        ],
    );

    assert_eq!(
        width_actions[0],
        CanvasAction::BlockResize {
            block_id,
            delta: Vec2::new(10.0, 0.0)
        }
    );
    assert_eq!(
        height_actions[0],
        CanvasAction::BlockResize {
            block_id,
            delta: Vec2::new(0.0, 6.0)
        }
    );
}

#[test]
fn resize_grows_block_in_environment_units() {
    let block = Block::new(Uuid::new_v4(), Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0));
    let mut canvas = canvas_with(&[block.clone()], Camera::new(Vec2::ZERO, 2.0));
    let mut gesture = BlockGesture::new(block.id, &GestureConfig::default());

    drive(
        &mut canvas,
        &mut gesture,
        &[
            down(PointerButton::Primary, 200.0, 200.0, HitTarget::ResizeWidthHeight),
            pointer_move(220.0, 240.0),
            up(220.0, 240.0),
        ],
    );

    let resized = canvas.block(block.id).unwrap();
    assert_eq!(resized.size, Vec2::new(110.0, 120.0));
    assert_eq!(resized.mode, BlockMode::Idle);
    assert!(canvas.take_dirty());
}

#[test]
fn relation_drop_uses_last_tracked_position() {
    let from = Block::new(Uuid::new_v4(), Vec2::new(0.0, 0.0), Vec2::new(50.0, 50.0));
    let to = Block::new(Uuid::new_v4(), Vec2::new(200.0, 0.0), Vec2::new(50.0, 50.0));
    let mut canvas = canvas_with(&[from.clone(), to.clone()], Camera::default());
    let mut gesture = BlockGesture::new(from.id, &GestureConfig::default());

    drive(
        &mut canvas,
        &mut gesture,
        &[
            down(PointerButton::Primary, 50.0, 0.0, HitTarget::RelationHandle),
            pointer_move(120.0, 10.0),
            pointer_move(220.0, 20.0),
        ],
    );
    assert_eq!(
        canvas.relation_draft().map(|draft| draft.current),
        Some(Vec2::new(220.0, 20.0))
    );

    drive(
        &mut canvas,
        &mut gesture,
        &[GestureInput::TouchEnd {
            position: Vec2::ZERO,
        }],
    );

    assert!(canvas.relation_draft().is_none());
    assert_eq!(canvas.relations().len(), 1);
    assert_eq!(canvas.relations()[0].from.id, from.id);
    assert_eq!(canvas.relations()[0].to.id, to.id);
}

#[test]
fn right_click_opens_context_menu_without_capturing() {
    let block = Block::new(Uuid::new_v4(), Vec2::ZERO, Vec2::new(50.0, 50.0));
    let mut canvas = canvas_with(&[block.clone()], Camera::default());
    let mut gesture = BlockGesture::new(block.id, &GestureConfig::default());

    let response = gesture.handle(
        down(PointerButton::Secondary, 10.0, 20.0, HitTarget::Body),
        BlockMode::Idle,
        &mut canvas,
    );

    assert!(response.suppress_default);
    assert!(response.effects.is_empty());
    assert!(gesture.state().is_idle());
    let menu = canvas.context_menu().unwrap();
    assert_eq!(menu.block_id, block.id);
    assert_eq!(menu.position, Vec2::new(10.0, 20.0));
}

#[test]
fn focused_block_lets_secondary_press_through() {
    let mut gesture = BlockGesture::new(Uuid::new_v4(), &GestureConfig::default());
    let mut actions = Vec::new();
    let response = gesture.handle(
        down(PointerButton::Secondary, 0.0, 0.0, HitTarget::Body),
        BlockMode::Focusing,
        &mut |action: CanvasAction| actions.push(action),
    );

    assert!(!response.suppress_default);
    assert!(actions.is_empty());
}

#[test]
fn non_primary_release_keeps_the_drag_alive() {
    let block_id = Uuid::new_v4();
    let mut gesture = BlockGesture::new(block_id, &GestureConfig::default());
    run(
        &mut gesture,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 0.0, 0.0, HitTarget::Body),
            pointer_move(10.0, 0.0),
        ],
    );

    let actions = run(
        &mut gesture,
        BlockMode::Moving,
        &[GestureInput::PointerUp {
            button: PointerButton::Auxiliary,
            position: Vec2::new(10.0, 0.0),
        }],
    );

    assert!(actions.is_empty());
    assert!(gesture.is_listening());
    assert_eq!(
        gesture.state(),
        GestureState::Moving {
            last: Vec2::new(10.0, 0.0)
        }
    );
}

#[test]
fn abort_releases_listeners_and_finishes_relation() {
    let block_id = Uuid::new_v4();
    let mut gesture = BlockGesture::new(block_id, &GestureConfig::default());
    run(
        &mut gesture,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 0.0, 0.0, HitTarget::RelationHandle),
            pointer_move(30.0, 40.0),
        ],
    );

    let mut actions = Vec::new();
    let response = gesture.abort(BlockMode::Idle, &mut |action: CanvasAction| {
        actions.push(action)
    });

    assert_eq!(response.effects, vec![ListenerEffect::DetachWindow]);
    assert!(!gesture.is_listening());
    assert_eq!(
        actions.last(),
        Some(&CanvasAction::RelationDrawEnd {
            block_id,
            position: Vec2::new(30.0, 40.0)
        })
    );
    assert!(gesture.abort(BlockMode::Idle, &mut |_: CanvasAction| {}).effects.is_empty());
}

#[test]
fn hit_test_picks_press_target_for_gesture() {
    let config = GestureConfig::default();
    let block = Block::new(Uuid::new_v4(), Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0));
    let rect = block.environment_rect(&Camera::default(), Vec2::new(800.0, 600.0));

    let corner = hit_test(&rect, Vec2::new(99.0, 99.0), &config.handles).unwrap();
    let body = hit_test(&rect, Vec2::new(50.0, 50.0), &config.handles).unwrap();
    assert_eq!(corner, HitTarget::ResizeWidthHeight);
    assert_eq!(body, HitTarget::Body);
    assert!(hit_test(&rect, Vec2::new(300.0, 300.0), &config.handles).is_none());

    let mut gesture = BlockGesture::new(block.id, &config);
    let actions = run(
        &mut gesture,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 99.0, 99.0, corner),
            pointer_move(104.0, 99.0),
        ],
    );
    assert!(matches!(actions[0], CanvasAction::BlockResize { .. }));
}

#[test]
fn gesture_logging_follows_settings_dev_flag() {
    let mut settings = Settings::default();
    settings.dev.log_gestures = true;
    let config = GestureConfig::default().with_dev_flags(&settings.dev);
    let mut gesture = BlockGesture::new(Uuid::new_v4(), &config);
    assert!(gesture.logs_dispatch());

    let actions = run(
        &mut gesture,
        BlockMode::Idle,
        &[
            down(PointerButton::Primary, 0.0, 0.0, HitTarget::Body),
            pointer_move(10.0, 0.0),
        ],
    );
    assert_eq!(actions.len(), 1);

    let quiet = BlockGesture::new(Uuid::new_v4(), &GestureConfig::default());
    assert!(!quiet.logs_dispatch());
}
