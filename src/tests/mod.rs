mod errors_test;
mod helpers_test;
mod mcp_test;
mod middleware_test;
mod mount_test;
mod projector_test;
mod websocket_test;
