use anvil::{Program, RunResult, Vm, VmConfig};
use clap::{App, Arg, ArgMatches};
use std::process;
use std::time::Instant;

fn args() -> ArgMatches {
    App::new("anvil")
        .about("a register/stack-hybrid bytecode virtual machine")
        .version("0.1.0")
        .arg(
            Arg::new("file")
                .takes_value(true)
                .required(true)
                .help("serialized program file to execute"),
        )
        .arg(
            Arg::new("disasm")
                .short('i')
                .long("disasm")
                .takes_value(false)
                .required(false)
                .help("prints the decoded instructions instead of running the program"),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .takes_value(false)
                .required(false)
                .help("prints machine state before each executed instruction"),
        )
        .arg(
            Arg::new("debug-heap")
                .short('m')
                .long("debug-heap")
                .takes_value(false)
                .required(false)
                .help("prints a heap dump before each executed instruction"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .takes_value(false)
                .required(false)
                .help("suppresses all output other than what the program is producing"),
        )
        .get_matches()
}

fn main() {
    let args = args();
    let file_name = args.value_of("file").unwrap();
    let config = VmConfig::new(
        args.is_present("debug"),
        args.is_present("debug-heap"),
        args.is_present("quiet"),
    );

    let start = Instant::now();
    let program = match Program::from_file(file_name) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };
    if !config.quiet {
        println!(
            "loaded {} ({} instructions) in {} µs",
            file_name,
            program.instructions.len(),
            start.elapsed().as_micros()
        );
    }

    if args.is_present("disasm") {
        for (index, instruction) in program.instructions.iter().enumerate() {
            let marker = if index == program.entrypoint { ">" } else { " " };
            println!(
                "{}{:04}: {} {}",
                marker, index, instruction.opcode, instruction.operand
            );
        }
        return;
    }

    let mut vm = Vm::new(program, config);
    let start = Instant::now();
    match vm.run() {
        Ok(RunResult::Exited(code)) => process::exit(code),
        Ok(RunResult::Halted) => {
            if !config.quiet {
                println!("\nroutine took {} ms", start.elapsed().as_millis());
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
