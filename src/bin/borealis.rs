use borealis::app::run_cli;

fn output_header() -> &'static str {
    "Borealis\nBorealis runs registered system commands from natural-language utterances,\ngated by intent confidence and optional speaker verification."
}

fn print_header() {
    println!("{}\n", output_header());
}

fn run() -> Result<(), String> {
    print_header();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
