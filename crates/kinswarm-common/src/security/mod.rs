//! Security module - tamper-evident fitness audit log

pub mod audit;

pub use audit::{
    AuditHandle, AuditLog, AuditRecorder, AuditSink, ConsoleAuditSink, FitnessAuditEntry,
    FitnessChange, JsonLinesAuditSink, MemoryAuditSink,
};
