//! Scores a profile given on the command line with the built-in engine.
//!
//! ```text
//! cargo run -p advisor-core --example score -- 150000 10000 10 2
//! ```

use advisor_core::compute;

fn main() {
    let args: Vec<u32> = std::env::args()
        .skip(1)
        .filter_map(|arg| arg.parse().ok())
        .collect();
    let [income, assets, risk, goals] = match args.as_slice() {
        [a, b, c, d] => [*a, *b, *c, *d],
        _ => {
            eprintln!("usage: score <income> <assets> <risk-score> <goals>");
            std::process::exit(2);
        }
    };
    let (product_id, match_score) = compute(income, assets, risk, goals);
    println!("product={product_id} score={match_score}");
}
