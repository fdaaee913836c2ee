//! CAMM-GL III: stateful emission, knife-offset compensation, and the
//! tolerant parser with its SVG view.

pub mod emitter;
pub mod knife;
pub mod render;
pub mod scan;
pub mod state;

pub use emitter::CammEmitter;
pub use knife::{KnifeConfig, KnifeCutter};
pub use render::{render_svg, RenderConfig};
pub use scan::{tokenise, Token};
pub use state::{Cond, MachineState, Mode, SetOp};
