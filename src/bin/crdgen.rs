//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions for the operator's record kinds.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/ec2.cattle.io.yaml
//! cargo run --bin crdgen -- --kind instance | kubectl apply -f -
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use ec2_operator::crd::{ImportKeyPair, Instance};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Instance,
    Keypair,
    All,
}

#[derive(Debug, Parser)]
#[command(name = "crdgen", about = "Print EC2 operator CRDs as YAML")]
struct Args {
    #[arg(long, value_enum, default_value_t = Kind::All)]
    kind: Kind,
}

fn crds(kind: Kind) -> Vec<CustomResourceDefinition> {
    match kind {
        Kind::Instance => vec![Instance::crd()],
        Kind::Keypair => vec![ImportKeyPair::crd()],
        Kind::All => vec![Instance::crd(), ImportKeyPair::crd()],
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let documents = crds(args.kind)
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", documents.join("---\n"));
    Ok(())
}
