//! Endpoint paths routed by the arm controller.
//!
//! These are the controller's routing table, opaque to the connection
//! layer: `send_request` accepts any string, these constants just keep
//! callers and tests honest about spelling.

pub const VIDEO_START: &str = "/app/video/start";
pub const VIDEO_STOP: &str = "/app/video/stop";

pub const SERVOS_SAVE_POSITION: &str = "/app/servos/savePosition";
pub const SERVOS_GET_ALL: &str = "/app/servos/getAll";
pub const SERVOS_GET: &str = "/app/servos/get";
pub const SERVOS_CREATE: &str = "/app/servos/create";
pub const SERVOS_UPDATE: &str = "/app/servos/update";
pub const SERVOS_DELETE: &str = "/app/servos/delete";

pub const MOVEMENTS_CREATE: &str = "/app/movements/create";
pub const MOVEMENTS_UPDATE: &str = "/app/movements/update";
pub const MOVEMENTS_DELETE: &str = "/app/movements/delete";
pub const MOVEMENTS_GET: &str = "/app/movements/get";
pub const MOVEMENTS_GET_ALL: &str = "/app/movements/getAll";

pub const POSITIONS_CREATE: &str = "/app/positions/create";
pub const POSITIONS_MOVE_UP: &str = "/app/positions/moveUp";
pub const POSITIONS_MOVE_DOWN: &str = "/app/positions/moveDown";
pub const POSITIONS_UPDATE: &str = "/app/positions/update";
pub const POSITIONS_DELETE: &str = "/app/positions/delete";
pub const POSITIONS_GET: &str = "/app/positions/get";
pub const POSITIONS_GET_ALL: &str = "/app/positions/getAll";
pub const POSITIONS_GET_BY_MOVEMENT: &str = "/app/positions/getByMovementId";
pub const POSITIONS_MOVE_TO_INITIAL: &str = "/app/positions/moveToInitial";
pub const POSITIONS_EXECUTE_MOVEMENT: &str = "/app/positions/executeMovement";
pub const POSITIONS_MOVE_TO: &str = "/app/positions/moveToPosition";
