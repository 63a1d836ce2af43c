//! End-to-end tests of the client against an in-process broker.

mod integration_test;
