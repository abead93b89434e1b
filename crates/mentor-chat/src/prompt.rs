//! Socratic system instruction sent as inference context.

use mentor_core::types::GroupContext;

/// Behavioral constraints the mentor persona must follow.
const MENTOR_RULES: &[&str] = &[
    "Nunca des la respuesta directamente.",
    "Responde siempre con una pregunta que guíe al grupo a descubrirla por sí mismo.",
    "Usa como máximo 2 o 3 frases.",
    "Usa un tono cercano y adecuado para estudiantes de secundaria.",
    "De vez en cuando añade un emoji ligero para mostrar interés.",
    "Responde en el mismo idioma que usan los estudiantes.",
];

/// Build the system instruction for a group's project.
pub fn build_system_prompt(group: &GroupContext) -> String {
    let mut prompt = String::from(
        "Eres un mentor socrático que acompaña a un grupo de estudiantes en su proyecto.\n",
    );

    let name = group.name.trim();
    if !name.is_empty() {
        prompt.push_str(&format!("Proyecto: {}\n", name));
    }

    let milestones: Vec<&str> = group
        .milestones
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .collect();
    if !milestones.is_empty() {
        prompt.push_str("Hitos del proyecto:\n");
        for milestone in milestones {
            prompt.push_str(&format!("- {}\n", milestone));
        }
    }

    prompt.push_str("Reglas:\n");
    for rule in MENTOR_RULES {
        prompt.push_str(&format!("- {}\n", rule));
    }
    prompt
}
