//! Assembly peephole optimizer.
//!
//! Grounded on `original_source/c5c/optimizer.py::optimize_asm`: a
//! fixed-point pass over the emitted instruction list, each round dropping
//! or collapsing a small set of patterns the naive codegen above produces
//! constantly (redundant push/pop pairs, jump-to-next-line, self-moves).
//! Runs to a fixed point because collapsing one window can expose another
//! (e.g. `push/pop` removal can bring a `mov X,X` into view).

pub(super) fn optimize(lines: &[String]) -> Vec<String> {
    let mut current = lines.to_vec();
    loop {
        let next = pass(&current);
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

fn pass(lines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        // `jmp L` immediately followed by its own target label: dead jump.
        if let Some(target) = jmp_target(&lines[i]) {
            if i + 1 < lines.len() && is_label(&lines[i + 1], &target) {
                i += 1;
                continue;
            }
        }

        if i + 1 < lines.len() {
            if let (Some(a), Some(b)) = (push_operand(&lines[i]), pop_operand(&lines[i + 1])) {
                if a == b {
                    // push X; pop X -> no-op.
                    i += 2;
                    continue;
                }
                // push X; pop Y -> mov X, Y.
                out.push(format!("    mov {}, {}", a, b));
                i += 2;
                continue;
            }
        }

        if let Some((src, dst)) = mov_operands(&lines[i]) {
            if src == dst {
                i += 1;
                continue;
            }
            if i + 1 < lines.len() {
                if let Some((src2, dst2)) = mov_operands(&lines[i + 1]) {
                    // mov A,B; mov B,A -> mov A,B.
                    if src2 == dst && dst2 == src {
                        out.push(lines[i].clone());
                        i += 2;
                        continue;
                    }
                }
            }
        }

        if let Some(imm) = add_or_sub_zero(&lines[i]) {
            let _ = imm;
            i += 1;
            continue;
        }

        // push A; mov X, B; pop C, with B disjoint from {A, C} -> reorder so
        // the mov can float past the push/pop pair.
        if i + 2 < lines.len() {
            if let (Some(a), Some((x, b)), Some(c)) =
                (push_operand(&lines[i]), mov_operands(&lines[i + 1]), pop_operand(&lines[i + 2]))
            {
                if b != a && b != c {
                    out.push(format!("    mov {}, {}", a, c));
                    out.push(format!("    mov {}, {}", x, b));
                    i += 3;
                    continue;
                }
            }
        }

        out.push(lines[i].clone());
        i += 1;
    }
    out
}

fn trimmed(line: &str) -> &str {
    line.trim()
}

fn is_label(line: &str, name: &str) -> bool {
    trimmed(line) == format!("{}:", name)
}

fn jmp_target(line: &str) -> Option<String> {
    let t = trimmed(line);
    t.strip_prefix("jmp ").map(|rest| rest.trim().to_string())
}

fn push_operand(line: &str) -> Option<String> {
    trimmed(line).strip_prefix("push ").map(|s| s.trim().to_string())
}

fn pop_operand(line: &str) -> Option<String> {
    trimmed(line).strip_prefix("pop ").map(|s| s.trim().to_string())
}

fn mov_operands(line: &str) -> Option<(String, String)> {
    let t = trimmed(line);
    let rest = t.strip_prefix("mov ")?;
    let (src, dst) = rest.split_once(',')?;
    Some((src.trim().to_string(), dst.trim().to_string()))
}

fn add_or_sub_zero(line: &str) -> Option<()> {
    let t = trimmed(line);
    for prefix in ["add $0, ", "sub $0, "] {
        if t.starts_with(prefix) {
            return Some(());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drops_matching_push_pop() {
        let out = optimize(&lines(&["    push %rax", "    pop %rax"]));
        assert!(out.is_empty());
    }

    #[test]
    fn rewrites_push_pop_into_mov() {
        let out = optimize(&lines(&["    push %rax", "    pop %rcx"]));
        assert_eq!(out, vec!["    mov %rax, %rcx".to_string()]);
    }

    #[test]
    fn drops_jump_to_next_label() {
        let out = optimize(&lines(&["    jmp .Lend", ".Lend:"]));
        assert_eq!(out, vec![".Lend:".to_string()]);
    }

    #[test]
    fn drops_self_move() {
        let out = optimize(&lines(&["    mov %rax, %rax"]));
        assert!(out.is_empty());
    }

    #[test]
    fn drops_add_sub_zero() {
        let out = optimize(&lines(&["    add $0, %rax", "    sub $0, %rcx"]));
        assert!(out.is_empty());
    }
}
