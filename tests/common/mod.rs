#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Input and output directories for one pipeline run
pub struct Workspace {
    pub root: TempDir,
    pub pharmacies: PathBuf,
    pub claims: PathBuf,
    pub reverts: PathBuf,
    pub out: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let pharmacies = root.path().join("pharmacies");
        let claims = root.path().join("claims");
        let reverts = root.path().join("reverts");
        let out = root.path().join("out");
        for dir in [&pharmacies, &claims, &reverts] {
            fs::create_dir_all(dir).unwrap();
        }
        Self {
            root,
            pharmacies,
            claims,
            reverts,
            out,
        }
    }

    pub fn write_pharmacies(&self, filename: &str, rows: &[(&str, &str)]) {
        let mut content = String::from("chain,npi\n");
        for (chain, npi) in rows {
            content.push_str(&format!("{},{}\n", chain, npi));
        }
        write_file(&self.pharmacies, filename, &content);
    }

    pub fn write_claims(&self, filename: &str, claims: &[String]) {
        write_file(&self.claims, filename, &format!("[{}]", claims.join(",")));
    }

    pub fn write_reverts(&self, filename: &str, reverts: &[String]) {
        write_file(&self.reverts, filename, &format!("[{}]", reverts.join(",")));
    }

    pub fn read_output(&self, filename: &str) -> serde_json::Value {
        let content = fs::read_to_string(self.out.join(filename)).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

pub fn write_file(dir: &Path, filename: &str, content: &str) -> PathBuf {
    let path = dir.join(filename);
    fs::write(&path, content).unwrap();
    path
}

pub fn claim_json(id: &str, npi: &str, ndc: &str, price: &str, quantity: &str) -> String {
    format!(
        r#"{{"id":"{}","npi":"{}","ndc":"{}","price":"{}","quantity":"{}","timestamp":"2024-03-01T12:00:00Z"}}"#,
        id, npi, ndc, price, quantity
    )
}

pub fn revert_json(id: &str, claim_id: &str) -> String {
    format!(
        r#"{{"id":"{}","claim_id":"{}","timestamp":"2024-03-02T12:00:00Z"}}"#,
        id, claim_id
    )
}
