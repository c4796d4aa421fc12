//! Scoped variable resolution, including `v_` pointer-style indirection.

use crate::context::Context;
use crate::value::{Scope, ScopedName};
use ahash::AHashMap;

/// Indirection chains longer than this resolve to "unset" instead of
/// looping; a self-referential chain is a content bug, not a crash.
pub const MAX_INDIRECTION: usize = 1000;

/// Formula-parameter bindings active during evaluation, innermost last.
/// Context-scope reads consult these before the context's transient map.
pub(crate) type Frames = Vec<AHashMap<String, String>>;

pub(crate) fn read_var(ctx: &dyn Context, frames: &Frames, name: &ScopedName) -> Option<String> {
    read_var_depth(ctx, frames, name, 0)
}

fn read_var_depth(
    ctx: &dyn Context,
    frames: &Frames,
    name: &ScopedName,
    depth: usize,
) -> Option<String> {
    match name.scope {
        Scope::Alpha | Scope::Beta => ctx.actor_var(name.scope.who(), &name.key),
        Scope::Global => ctx.global_var(&name.key),
        Scope::Context => read_context_var(ctx, frames, &name.key),
        Scope::Indirect => {
            if depth >= MAX_INDIRECTION {
                return None;
            }
            let target = ScopedName::parse(&read_context_var(ctx, frames, &name.key)?);
            read_var_depth(ctx, frames, &target, depth + 1)
        }
    }
}

fn read_context_var(ctx: &dyn Context, frames: &Frames, key: &str) -> Option<String> {
    frames
        .iter()
        .rev()
        .find_map(|frame| frame.get(key).cloned())
        .or_else(|| ctx.context_var(key))
}

/// Write through a scoped name. Writing through an indirect name whose chain
/// does not resolve is a silent no-op, consistent with reads treating a
/// broken chain as unset.
pub(crate) fn write_var(ctx: &mut dyn Context, frames: &Frames, name: &ScopedName, value: String) {
    let Some(name) = resolve_indirection(ctx, frames, name, 0) else {
        return;
    };
    match name.scope {
        Scope::Alpha | Scope::Beta => ctx.set_actor_var(name.scope.who(), &name.key, value),
        Scope::Global => ctx.set_global_var(&name.key, value),
        Scope::Context => ctx.set_context_var(&name.key, value),
        // resolve_indirection never returns an Indirect name
        Scope::Indirect => {}
    }
}

fn resolve_indirection(
    ctx: &dyn Context,
    frames: &Frames,
    name: &ScopedName,
    depth: usize,
) -> Option<ScopedName> {
    if name.scope != Scope::Indirect {
        return Some(name.clone());
    }
    if depth >= MAX_INDIRECTION {
        return None;
    }
    let target = ScopedName::parse(&read_context_var(ctx, frames, &name.key)?);
    resolve_indirection(ctx, frames, &target, depth + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScriptContext;
    use crate::value::Who;
    use pretty_assertions::assert_eq;

    #[test]
    fn scopes_route_to_their_stores() {
        let mut ctx = ScriptContext::new();
        ctx.set_actor_var(Who::Alpha, "str", "8".into());
        ctx.set_actor_var(Who::Beta, "str", "4".into());
        ctx.set_global_var("kills", "12".into());
        ctx.set_context_var("here", "1".into());

        let frames = Frames::new();
        let read = |name: &str| read_var(&ctx, &frames, &ScopedName::parse(name));
        assert_eq!(read("u_str"), Some("8".into()));
        assert_eq!(read("npc_str"), Some("4".into()));
        assert_eq!(read("global_kills"), Some("12".into()));
        assert_eq!(read("kills"), Some("12".into()));
        assert_eq!(read("_here"), Some("1".into()));
        assert_eq!(read("u_unset"), None);
    }

    #[test]
    fn indirection_follows_the_stored_name() {
        let mut ctx = ScriptContext::new();
        ctx.set_context_var("ptr", "u_str".into());
        ctx.set_actor_var(Who::Alpha, "str", "8".into());

        let frames = Frames::new();
        let name = ScopedName::parse("v_ptr");
        assert_eq!(read_var(&ctx, &frames, &name), Some("8".into()));

        write_var(&mut ctx, &frames, &name, "9".into());
        assert_eq!(ctx.actor_var(Who::Alpha, "str"), Some("9".into()));
    }

    #[test]
    fn self_referential_chain_terminates_as_unset() {
        let mut ctx = ScriptContext::new();
        ctx.set_context_var("a", "v_a".into());

        let frames = Frames::new();
        let name = ScopedName::parse("v_a");
        assert_eq!(read_var(&ctx, &frames, &name), None);
        // Writes through the same chain are dropped, not an error.
        write_var(&mut ctx, &frames, &name, "5".into());
        assert_eq!(ctx.context_var("a"), Some("v_a".into()));
    }
}
