pub mod actions;
pub mod cli;
pub mod decode;
pub mod expr;
pub mod grf;

use anyhow::Context;
use clap::Parser;

use actions::Action;
use decode::DecodedRecord;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // 1. ── Read ───────────────────────────────────────────────────────
    let data = std::fs::read(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;

    // 2. ── Decode ─────────────────────────────────────────────────────
    let decoded = decode::decode(&data).with_context(|| "Decoding container")?;

    // 3. ── Report ─────────────────────────────────────────────────────
    if args.json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        print_report(&decoded);
    }
    for warning in &decoded.diagnostics {
        eprintln!("warning: {warning}");
    }

    Ok(())
}

fn print_report(decoded: &decode::DecodedGrf) {
    println!("container v{}", decoded.container_version);
    for (i, record) in decoded.records.iter().enumerate() {
        println!("{i:4}: {}", describe(record));
    }
    for sprite in &decoded.sprites {
        println!(
            "sprite {} zoom {}: {}x{} at ({}, {}), {} bytes",
            sprite.id, sprite.zoom, sprite.width, sprite.height, sprite.xofs, sprite.yofs,
            sprite.data_len
        );
    }
}

fn describe(record: &DecodedRecord) -> String {
    let action = match record {
        DecodedRecord::Preamble(v) => return format!("preamble {v}"),
        DecodedRecord::SpriteRef(id) => return format!("real sprite {id}"),
        DecodedRecord::Unknown { action, payload } => {
            return format!("unknown action {action:#04x}, {} bytes", payload.len());
        }
        DecodedRecord::Action(action) => action,
    };
    match action {
        Action::Properties {
            feature,
            first_id,
            count,
            props,
        } => {
            let names: Vec<_> = props.iter().map(|(n, _)| n.as_str()).collect();
            format!(
                "properties {feature:?} ids {first_id}+{count}: {}",
                names.join(", ")
            )
        }
        Action::SpriteSet {
            feature,
            set_count,
            sprite_count,
        } => format!("sprite sets {feature:?}: {set_count} sets of {sprite_count}"),
        Action::BasicLayout {
            feature, set_id, ..
        } => format!("layout {feature:?} set {set_id}"),
        Action::AdvancedLayout {
            feature,
            set_id,
            layout,
        } => format!(
            "layout {feature:?} set {set_id}, {} entries",
            layout.entries.len()
        ),
        Action::SpriteGroups {
            feature,
            set_id,
            loaded,
            loading,
        } => format!(
            "groups {feature:?} set {set_id}: {} loaded, {} loading",
            loaded.len(),
            loading.len()
        ),
        Action::VarAction2 {
            feature,
            set_id,
            related,
            code,
            ranges,
            ..
        } => {
            let text: Vec<_> = code.iter().map(|n| n.to_string()).collect();
            format!(
                "switch {feature:?} set {set_id}{}: {} ({} ranges)",
                if *related { " related" } else { "" },
                text.join("; "),
                ranges.len()
            )
        }
        Action::Map { feature, ids, .. } => format!("map {feature:?} ids {ids:?}"),
        Action::Strings {
            feature,
            lang,
            first_id,
            strings,
        } => format!(
            "strings {feature:?} lang {lang:#04x} from {first_id}: {} entries",
            strings.len()
        ),
        Action::ReplaceNew {
            set_type, count, ..
        } => format!("replace new type {set_type:#04x}, {count} sprites"),
        Action::PatchParams { params } => format!("patch {} offsets from parameters", params.len()),
        Action::Description { grfid, name, .. } => format!(
            "grf {} \"{name}\"",
            grfid
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join("")
        ),
        Action::ReplaceOld { sets } => format!("replace old, {} sets", sets.len()),
        Action::ParamOp {
            target, operation, ..
        } => format!("param[{target:#04x}] {operation:?}"),
        Action::Info { chunks } => format!("metadata, {} top-level chunks", chunks.len()),
    }
}
