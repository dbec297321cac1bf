use std::fs;

use assert2::{check, let_assert};
use byteorder::{ByteOrder, LittleEndian};
use seqtree::{
    Error, MemoryWriter, PrepareErrorKind, PrepareMode, SeqAxis, SequenceTree, SEQDIAG_GROUP,
};

const GRADIENT_ECHO: &str = r#"{
    "parameters": { "GradMaxAmpl": 2.0, "GradSlewRate": 100.0, "PhaseLock": 0.5 },
    "sequence": { "ConcatSequence": { "Name": "Loop", "Repetitions": 2, "Children": [
        { "AtomicSequence": { "Name": "Excitation", "Pulse": { "HardRfPulse": {
            "Name": "RF", "FlipAngle": 30, "Duration": 0.1
        } } } },
        { "AtomicSequence": { "Name": "Readout", "Pulse": { "TrapGradPulse": {
            "Name": "RO", "Axis": "GX", "Area": 10.0, "ADCs": 3, "PhaseLock": 1
        } } } }
    ] } }
}"#;

fn prepared_tree() -> SequenceTree {
    let mut tree = SequenceTree::from_json(GRADIENT_ECHO).unwrap();
    tree.prepare(PrepareMode::Strict).unwrap();
    tree
}

#[test]
fn datasets_in_memory() {
    let tree = prepared_tree();
    // RF: boundaries only, readout: boundaries, 2 corners and 3 ADCs
    check!(tree.num_tpois() == 2 * (2 + 7));
    check!(tree.num_adcs() == 6);
    check!((tree.duration() - 2.0 * (0.1 + 5.02)).abs() < 1e-12);

    let mut writer = MemoryWriter::new();
    let diagram = tree.write_seq_diag(&mut writer).unwrap();
    check!(writer.len() == 10);
    for urn in ["T", "RXP", "TXM", "TXP", "GX", "KX", "GY", "KY", "GZ", "KZ"] {
        let_assert!(Some(data) = writer.get(SEQDIAG_GROUP, urn));
        check!(data.len() == tree.num_tpois() + 1);
    }

    let_assert!(Some(rxp) = writer.get(SEQDIAG_GROUP, "RXP"));
    check!(rxp[0] == -1.0);
    check!(rxp.iter().filter(|&&p| p == 0.5).count() == 6);
    check!(diagram.num_adcs() == 6);

    let_assert!(Some(time) = writer.get(SEQDIAG_GROUP, "T"));
    check!(time.windows(2).all(|t| t[0] < t[1]));

    // each readout adds its area to the trajectory
    let_assert!(Some(kx) = writer.get(SEQDIAG_GROUP, "KX"));
    check!((kx[kx.len() - 1] - 20.0).abs() < 1e-6);
    let_assert!(Some(ky) = writer.get(SEQDIAG_GROUP, "KY"));
    check!(ky.iter().all(|&k| k == 0.0));

    let flip = diagram.axis(SeqAxis::TxMagnitude)[1] * 0.1;
    check!((flip - 30f64.to_radians()).abs() < 1e-12);
    check!(diagram.axis(SeqAxis::Gx)[1] == 0.0);
}

#[test]
fn attribute_update_changes_diagram() {
    let mut tree = prepared_tree();
    tree.set_attribute("RO", "Area", -5.0).unwrap();
    let_assert!(Err(Error::NotPrepared) = tree.seq_diag());

    tree.prepare(PrepareMode::Update).unwrap();
    let diagram = tree.seq_diag().unwrap();
    check!((diagram.kspace.x[diagram.len() - 1] + 10.0).abs() < 1e-6);
}

#[test]
fn failed_prepare_lists_errors() {
    let mut tree = prepared_tree();
    tree.set_attribute("RO", "Duration", 1.0).unwrap();
    tree.set_attribute("RF", "Duration", 0.0).unwrap();
    let_assert!(Err(failure) = tree.prepare(PrepareMode::Strict));
    check!(failure.sequence == "Loop");
    check!(failure.errors.len() == 2);
    check!(failure.errors[0].node == "RF");
    check!(matches!(failure.errors[1].kind, PrepareErrorKind::Infeasible(_)));
}

#[test]
fn export_to_directory() {
    let tree = prepared_tree();
    let root = std::env::temp_dir().join(format!("seqtree-it-{}", rand::random::<u64>()));
    let diagram = tree.seq_diag_to_dir(&root).unwrap();

    let bytes = fs::read(root.join("seqdiag").join("KX.f64")).unwrap();
    let mut kx = vec![0.0; bytes.len() / 8];
    LittleEndian::read_f64_into(&bytes, &mut kx);
    check!(kx == diagram.kspace.x);
    check!(fs::read_dir(root.join("seqdiag")).unwrap().count() == 10);
    fs::remove_dir_all(&root).unwrap();
}

#[test]
fn export_fails_before_writing() {
    let tree = prepared_tree();
    let file = std::env::temp_dir().join(format!("seqtree-it-file-{}", rand::random::<u64>()));
    fs::write(&file, b"").unwrap();
    let_assert!(Err(Error::Export { .. }) = tree.seq_diag_to_dir(&file));
    check!(fs::read(&file).unwrap().is_empty());
    fs::remove_file(&file).unwrap();
}

#[test]
fn unprepared_export() {
    let tree = SequenceTree::from_json(GRADIENT_ECHO).unwrap();
    let dir = std::env::temp_dir().join(format!("seqtree-it-none-{}", rand::random::<u64>()));
    let_assert!(Err(Error::NotPrepared) = tree.seq_diag_to_dir(&dir));
    check!(!dir.exists());
}

#[test]
fn demo_sequence() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/gradient_echo.json");
    let mut tree = SequenceTree::from_file(path).unwrap();
    tree.prepare(PrepareMode::Verbose).unwrap();
    check!(tree.num_adcs() == 4 * 64);

    let diagram = tree.seq_diag().unwrap();
    // prephaser and readout cancel at the echo, the middle ADC of the first readout
    let adcs: Vec<usize> = (0..diagram.len())
        .filter(|&i| diagram.receiver_phase[i] >= 0.0)
        .collect();
    let echo = adcs[32];
    let readout_start = adcs[0] - 1;
    check!(diagram.kspace.x[readout_start] < -6.3);
    check!(diagram.kspace.x[echo].abs() < 0.3);

    let_assert!(Err(Error::Read { .. }) = SequenceTree::from_file("demos/missing.json"));
}
