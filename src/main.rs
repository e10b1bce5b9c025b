use std::path::{Path, PathBuf};

use clap::Parser;
use slab_optimizer::render;
use slab_optimizer::{Quote, QuoteRequest};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "slab_optimizer",
    about = "Slab layout and pricing for stone fabrication quotes"
)]
struct Cli {
    /// Quote request JSON with products, catalog and settings
    request: PathBuf,

    /// Show ASCII layout of each slab
    #[arg(long)]
    layout: bool,

    /// Print the full quote as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Size every product on its own slabs, without sharing
    #[arg(long)]
    independent: bool,

    /// Log packing decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn load_request(path: &Path) -> Result<QuoteRequest, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    let request = QuoteRequest::from_json(&raw)
        .map_err(|e| format!("invalid quote request '{}': {}", path.display(), e))?;
    request.settings.validate().map_err(|e| e.to_string())?;
    Ok(request)
}

fn print_quote(request: &QuoteRequest, quote: &Quote, layout: bool) {
    for group in quote.packed_groups() {
        println!(
            "{}: {} slab{} ({}x{}), {:.1}% average efficiency",
            group.key,
            group.total_slabs,
            if group.total_slabs == 1 { "" } else { "s" },
            group.variant.slab_width,
            group.variant.slab_height,
            group.average_efficiency,
        );
        for (i, slab) in group.slabs.iter().enumerate() {
            println!("  Slab {}: {:.1}%", i + 1, slab.efficiency);
            for p in &slab.pieces {
                let rot = if p.placement.rotated { " [rotated]" } else { "" };
                println!(
                    "    {} {} @ ({}, {}){}",
                    p.piece.name,
                    p.footprint(),
                    p.placement.x,
                    p.placement.y,
                    rot
                );
            }
            if layout {
                print!("{}", render::render_slab(slab));
            }
        }
        println!();
    }

    for (key, err) in quote.failed_groups() {
        println!("{key}: not optimized ({err}), products priced individually");
    }

    for (i, (product, result)) in request.products.iter().zip(&quote.products).enumerate() {
        let name = product.display_name(i);
        match result {
            Some(r) => println!(
                "{}: {:.2} sq ft, {:.2} slabs, {:.1}% efficiency, ${:.2}",
                name, r.usable_area_sqft, r.slabs_needed, r.efficiency, r.final_price
            ),
            None => println!("{name}: not priced"),
        }
    }

    println!(
        "Summary: {:.2} slabs, {:.1}% average efficiency, ${:.2} total",
        quote.summary.total_slabs, quote.summary.average_efficiency, quote.summary.total_price,
    );
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let mut request = load_request(&cli.request).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    if cli.independent {
        request.settings.multi_product_optimization = false;
    }

    let quote = request.run();

    if cli.json {
        match serde_json::to_string_pretty(&quote) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_quote(&request, &quote, cli.layout);
    }
}
