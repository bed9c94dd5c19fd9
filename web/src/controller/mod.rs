pub(crate) mod health_check_controller;
pub(crate) mod info_controller;
pub(crate) mod session_controller;
