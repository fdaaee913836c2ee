//! Emitter state discipline, knife-offset output, and the CAMM → SVG
//! verification path.

mod common;

use cammrust::camm::emitter::CammEmitter;
use cammrust::camm::knife::{KnifeConfig, KnifeCutter};
use cammrust::camm::render::{render_svg, RenderConfig};
use cammrust::camm::scan::{tokenise, Token};
use cammrust::notification::{NotificationCollection, NotificationType};
use cammrust::types::Vector2;
use common::pts;

/// Scenario: offset 0.5 on the L-shaped path.  The blade aligns, each
/// segment aims past its target, and the corner pivots about the blade.
#[test]
fn knife_offset_scenario() {
    let mut emitter = CammEmitter::new(Vec::new());
    emitter.header().unwrap();
    let mut cutter = KnifeCutter::new(KnifeConfig {
        offset: 0.5,
        ..KnifeConfig::default()
    });
    cutter
        .cut(&mut emitter, &pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]))
        .unwrap();
    let out = String::from_utf8(emitter.into_inner()).unwrap();
    assert_eq!(out, "\u{3}IN;PU0,0;PD0.5,0;PD10.5,0;AA10,0,90;PD10,10.5;");
}

/// State discipline law: replaying the emitted stream through the
/// tolerant parser, every pen/mode-dependent command finds the state its
/// table requires.
#[test]
fn emitter_state_discipline() {
    let mut emitter = CammEmitter::new(Vec::new());
    emitter.header().unwrap();
    emitter.moveto(Vector2::new(0.0, 0.0)).unwrap();
    emitter.lineto(Vector2::new(5.0, 0.0)).unwrap();
    emitter.circle(2.0).unwrap();
    emitter.arc_relative(Vector2::new(0.0, 1.0), 180.0).unwrap();
    emitter.lineto_relative(Vector2::new(1.0, 1.0)).unwrap();
    emitter.moveto(Vector2::new(9.0, 9.0)).unwrap();
    emitter.footer().unwrap();
    let out = String::from_utf8(emitter.into_inner()).unwrap();

    let mut pen_down: Option<bool> = None;
    let mut absolute: Option<bool> = None;
    for token in tokenise(&out).unwrap() {
        if let Token::Command { mnemonic, .. } = token {
            match mnemonic.as_str() {
                "IN" => {
                    pen_down = Some(false);
                    absolute = Some(true);
                }
                "PU" => {
                    assert_eq!(absolute, Some(true), "PU outside absolute mode");
                    pen_down = Some(false);
                }
                "PD" => pen_down = Some(true),
                "PA" => absolute = Some(true),
                "PR" => absolute = Some(false),
                "CI" => assert_eq!(pen_down, Some(true), "CI with pen up"),
                "AA" => {
                    assert_eq!(pen_down, Some(true), "AA with pen up");
                    absolute = Some(true);
                }
                "AR" => {
                    assert_eq!(pen_down, Some(true), "AR with pen up");
                    absolute = Some(false);
                }
                _ => {}
            }
        }
    }
}

/// Scenario: movement stream renders to the expected SVG path.
#[test]
fn camm_to_svg_movement_scenario() {
    let mut notes = NotificationCollection::new();
    let svg = render_svg(
        "IN;PA;PU0,0;PD100,0;PD100,100;PU;",
        &RenderConfig::default(),
        &mut notes,
    )
    .unwrap();
    assert!(svg.contains("M 0 0 L 100 0 L 100 100"), "svg: {svg}");
    assert!(svg.contains("scale(1 -1)"));
    assert!(notes.is_empty());
}

/// The emitted pipeline output renders back without complaints.
#[test]
fn emitted_stream_parses_back() {
    let mut emitter = CammEmitter::new(Vec::new());
    emitter.header().unwrap();
    let mut cutter = KnifeCutter::new(KnifeConfig {
        offset: 0.5,
        ..KnifeConfig::default()
    });
    cutter
        .cut(&mut emitter, &pts(&[(0.0, 0.0), (40.0, 0.0), (40.0, 40.0)]))
        .unwrap();
    emitter.footer().unwrap();
    let out = String::from_utf8(emitter.into_inner()).unwrap();

    let mut notes = NotificationCollection::new();
    let svg = render_svg(&out, &RenderConfig::default(), &mut notes).unwrap();
    // The reset byte is tolerated silently: no bad-input errors, only the
    // tool-select no-op warning from the footer.
    assert!(!notes.has_type(NotificationType::Error), "notes: {notes:?}");
    assert!(svg.contains("<path"));
}

/// Tolerant parsing: garbage is reported, whitespace is not.
#[test]
fn bad_input_handling() {
    let mut notes = NotificationCollection::new();
    render_svg("IN;\n\n  PU0,0;", &RenderConfig::default(), &mut notes).unwrap();
    assert!(notes.is_empty());

    let mut notes = NotificationCollection::new();
    render_svg("IN;~~~PU0,0;", &RenderConfig::default(), &mut notes).unwrap();
    assert!(notes.has_type(NotificationType::Error));
}

/// Split mode produces one coloured path per pen-down stretch.
#[test]
fn split_mode_colours_by_cut_order() {
    let mut notes = NotificationCollection::new();
    let svg = render_svg(
        "IN;PU0,0;PD10,0;PU20,0;PD30,0;PU40,0;PD50,0;",
        &RenderConfig { split: true },
        &mut notes,
    )
    .unwrap();
    assert_eq!(svg.matches("<path").count(), 3);
    assert!(svg.contains("hsl(0, 90%, 40%)"));
    assert!(svg.contains("hsl(120, 90%, 40%)"));
    assert!(svg.contains("hsl(240, 90%, 40%)"));
}
