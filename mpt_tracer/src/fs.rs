use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use mpt_proof::{
    graph::TrieGraph,
    leaf::LeafList,
    proof_set::{BlockProofSet, Phase, PhaseProofs},
    utils::address_key,
};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::io::AsyncWriteExt;

const INDENT: &[u8] = b"    ";
const TMP_SUFFIX: &str = ".tmp";

/// One output file, already serialized.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// Serializes every artifact of a block, the post-state ones (named after the
/// block) first, then the pre-state ones (named after its parent).
pub fn render_artifacts(proof_set: &BlockProofSet) -> serde_json::Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();

    for phase in [Phase::PostState, Phase::PreState] {
        let block = phase.state_block(proof_set.block_number);
        let proofs = proof_set.phase(phase);
        artifacts.extend(render_phase(proofs, block)?);
    }

    Ok(artifacts)
}

fn render_phase(proofs: &PhaseProofs, block: u64) -> serde_json::Result<Vec<Artifact>> {
    let storage_graphs = proofs
        .storage_graphs()
        .map(|(_, graph)| graph)
        .collect::<Vec<&TrieGraph>>();
    let storage_leaves = proofs
        .storage_leaves()
        .map(|(address, leaves)| (address_key(&address), leaves))
        .collect::<BTreeMap<String, &LeafList>>();

    Ok(vec![
        artifact(format!("mpt_account_batch_{block}.json"), proofs.account_graph())?,
        artifact(format!("mpt_leaf_account_{block}.json"), proofs.account_leaves())?,
        artifact(format!("mpt_storage_multi_trie_{block}.json"), &storage_graphs)?,
        artifact(
            format!("mpt_leaf_storage_multi_trie_{block}.json"),
            &storage_leaves,
        )?,
        artifact(
            format!("mpt_account_batch_no_leaf_{block}.json"),
            &proofs.account_graph().without_leaves(),
        )?,
    ])
}

fn artifact<T: Serialize + ?Sized>(file_name: String, value: &T) -> serde_json::Result<Artifact> {
    let mut contents = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut contents, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;

    Ok(Artifact { file_name, contents })
}

/// Writes `artifacts` into `output_dir`, creating it if needed.
///
/// Every artifact is first written to a temporary file. Only once all of them
/// are on disk are they renamed to their final names. If any step fails, the
/// temporary files and the artifacts moved so far are removed again, so a
/// failed write leaves no artifact behind.
pub async fn write_artifacts(
    output_dir: &Path,
    artifacts: Vec<Artifact>,
) -> anyhow::Result<Vec<PathBuf>> {
    if !output_dir.exists() {
        tracing::info!("Created output directory {:?}", output_dir.display());
    }
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts.iter() {
        let path = output_dir.join(&artifact.file_name);
        let tmp_path = output_dir.join(format!("{}{TMP_SUFFIX}", artifact.file_name));

        if let Err(e) = write_file(&tmp_path, &artifact.contents).await {
            staged.push((tmp_path, path));
            remove_all(staged.iter().map(|(tmp, _)| tmp)).await;
            return Err(e);
        }
        staged.push((tmp_path, path));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (i, (tmp_path, path)) in staged.iter().enumerate() {
        if let Err(e) = tokio::fs::rename(tmp_path, path).await {
            remove_all(written.iter().chain(staged[i..].iter().map(|(tmp, _)| tmp))).await;
            return Err(e).with_context(|| {
                format!("Failed to move artifact into place at {}", path.display())
            });
        }
        written.push(path.clone());
    }

    Ok(written)
}

async fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let mut f = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    f.write_all(contents)
        .await
        .context("Failed to write artifact to disk")?;
    f.flush().await?;

    Ok(())
}

/// Removes every file in `paths`, logging the ones that cannot be removed.
/// Files that do not exist are skipped.
async fn remove_all<'a>(paths: impl Iterator<Item = &'a PathBuf>) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => (),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (),
            Err(e) => tracing::warn!("Unable to remove {}: {e}", path.display()),
        }
    }
}
