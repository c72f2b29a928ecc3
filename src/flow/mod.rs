//! Flowchart model: conversion from block IR, merging of per-function flows,
//! and regeneration of code from a flow graph.

pub mod codegen;
pub mod convert;
pub mod merge;
pub mod types;

pub use codegen::{CodegenError, flow_to_ir, flow_to_python, rewrite_counting_loops};
pub use convert::convert_program;
pub use merge::{ComponentKind, classify_component, merge};
pub use types::{EdgeStyle, FlowEdge, FlowGraph, FlowNode, Port, Shape};
