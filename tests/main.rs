mod support;

mod cursor_test;
mod pool_test;
mod protocol_test;
