//! Canned payloads of the ingestion service, shaped like its real responses

use serde_json::{json, Value};

/// Body of `POST /upload-pdf`
pub fn queued_upload(job_id: &str, doc_id: &str) -> Value {
    json!({ "job_id": job_id, "doc_id": doc_id, "status": "queued" })
}

/// Body of `POST /upload` (indexed inline)
pub fn sync_upload(doc_id: &str, filename: &str, chunks_created: u64) -> Value {
    json!({ "doc_id": doc_id, "filename": filename, "chunks_created": chunks_created })
}

/// Status right after submission; the service already attaches a zeroed progress block
pub fn queued(job_id: &str) -> Value {
    json!({
        "job_id": job_id,
        "status": "queued",
        "progress": { "page": 0, "total_pages": null, "chunks_indexed": 0 }
    })
}

pub fn processing(job_id: &str, page: u64, total_pages: u64) -> Value {
    json!({
        "job_id": job_id,
        "status": "processing",
        "progress": { "page": page, "total_pages": total_pages, "chunks_indexed": page * 3 }
    })
}

pub fn done(job_id: &str, doc_id: &str, chunks_created: u64) -> Value {
    json!({
        "job_id": job_id,
        "status": "done",
        "result": { "doc_id": doc_id, "filename": "report.pdf", "chunks_created": chunks_created }
    })
}

pub fn failed(job_id: &str, error: &str) -> Value {
    json!({ "job_id": job_id, "status": "error", "error": error })
}

pub fn documents() -> Value {
    json!({
        "documents": [
            { "doc_id": "0f8e2c1a-7b9d-4c3e-a1f2-9d8e7c6b5a41", "filename": "handbook.pdf" },
            { "doc_id": "5a1b2c3d-4e5f-6789-abcd-ef0123456789", "filename": "notes.txt" }
        ]
    })
}

pub fn answer() -> Value {
    json!({
        "answer": "Employees accrue 1.5 vacation days per month.",
        "confidence": 0.74,
        "sources": [
            {
                "filename": "handbook.pdf",
                "doc_id": "0f8e2c1a-7b9d-4c3e-a1f2-9d8e7c6b5a41",
                "page": 12,
                "score": 0.35,
                "preview": "Vacation accrues at a rate of 1.5 days per month of service..."
            },
            {
                "filename": "handbook.pdf",
                "doc_id": "0f8e2c1a-7b9d-4c3e-a1f2-9d8e7c6b5a41",
                "page": null,
                "score": 0.2,
                "preview": "Summary of the employee handbook."
            }
        ]
    })
}
