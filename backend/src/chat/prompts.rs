//! Prompts and fixed copy used by the chat session
//!
//! Everything the agent persona says without asking the model lives here,
//! alongside the instructions sent to the model.

/// Shown when name validation fails for transport reasons
pub const VALIDATION_FALLBACK: &str =
    "Hubo un problema verificando la información. Vamos a continuar. ¿En qué puedo ayudarte?";

/// Shown when a regular message cannot reach the model
pub const CONNECTION_FALLBACK: &str =
    "Lo siento, tengo problemas de conexión. Por favor, intenta de nuevo más tarde.";

/// Shown when the inactivity window closes the session
pub const INACTIVITY_CLOSE: &str = "Parece que no hay nadie. He cerrado esta sesión por inactividad. Si quieres continuar, puedes iniciar un nuevo chat.";

/// Shown after the complaint form link
pub const COMPLAINT_FOLLOW_UP: &str = "Al finalizarlo, tu caso será escalado. ¿Hay algo más en lo que pueda asistirte mientras tanto?";

/// Question above the rating levels
pub const RATING_QUESTION: &str = "¿Cómo calificarías mi atención?";

/// Label of the hand-off link
pub const HANDOFF_LABEL: &str = "Finalizar en WhatsApp";

/// Label of the complaint form link
pub const COMPLAINT_LABEL: &str = "Abrir Formulario";

/// Label of the reconnect action
pub const RECONNECT_LABEL: &str = "Conectar con otro agente";

/// Text of the connecting loader
pub const CONNECTING_TEXT: &str = "Buscando un agente disponible...";

/// Header label naming the current agent
pub fn agent_label(agent_name: &str) -> String {
    format!("Hablando con {}", agent_name)
}

/// Opening message of every session
pub fn welcome_message(agent_name: &str) -> String {
    format!(
        r#"<div class="welcome-message">
    <p class="greeting">🐰 <strong>¡Hola!</strong> Soy <strong>{agent}</strong>, tu agente comercial para esta sesión.</p>
    <p>Estoy aquí para ayudarte con:</p>
    <ul class="topics-list markdown-list">
        <li>🐇 Información sobre nuestras <strong>razas de conejos</strong></li>
        <li>🥕 <strong>Alimentos y productos</strong> para tu mascota</li>
        <li>💉 Servicios de <strong>desparasitación y salud</strong></li>
        <li>📋 <strong>Asesoría personalizada</strong> para tu compra</li>
    </ul>
    <p>Para darte una atención más personalizada, <strong>¿con quién tengo el gusto?</strong></p>
</div>"#,
        agent = agent_name
    )
}

/// Classifier prompt for the customer's answer to the name question
pub fn name_validation_prompt(answer: &str) -> String {
    format!(
        "Analiza la siguiente respuesta a la pregunta \"¿Con quién tengo el gusto?\": \"{}\". \
Determina si es un nombre de persona plausible y respetuoso. Considera el \"albur\" y doble sentido \
del español de México. Responde únicamente con \"VALID\" si es un nombre apropiado, o \"INVALID\" si \
es una broma, albur, o claramente no es un nombre.",
        answer
    )
}

/// Prompt asking the model to push back on a joke name
pub fn scold_prompt(agent_name: &str, answer: &str) -> String {
    format!(
        "Eres {}, un agente de chat profesional y con chispa. Un cliente ha respondido \"{}\" cuando \
le preguntaste su nombre, lo cual es inapropiado o es una broma (albur). Genera una respuesta corta, \
firme pero educada, pidiendo una comunicación respetuosa para poder continuar y pidiendo de nuevo el nombre.",
        agent_name, answer
    )
}

/// History entry recorded once the name is accepted
pub fn name_turn(name: &str) -> String {
    format!("Mi nombre es {}", name)
}

/// Greeting after a valid name
pub fn greeting(customer_name: &str) -> String {
    format!(
        "¡Mucho gusto, {}! Ahora sí, ¿en qué puedo ayudarte hoy en GCMiRinconcito?",
        customer_name
    )
}

/// Closing line before the rating prompt
pub fn farewell(customer_name: &str) -> String {
    format!(
        "Perfecto, {}. Ha sido un placer. Puedes calificar mi servicio a continuación.",
        customer_name
    )
}

/// Empathetic replies to an escalation, one is picked at random
pub fn complaint_messages(customer_name: &str) -> [String; 2] {
    [
        format!(
            "Lamento mucho que tu experiencia no haya sido la ideal, {}. Tu opinión es muy importante. \
Por favor, completa el siguiente formulario para que un gerente revise tu caso.",
            customer_name
        ),
        format!(
            "Entiendo tu frustración, {}. Permíteme ayudarte. Puedes registrar tu caso en el siguiente \
formulario para atención directa de gerencia.",
            customer_name
        ),
    ]
}

/// Idle prompts; the session never repeats one until all were shown
pub fn nudge_messages(customer_name: &str) -> [String; 4] {
    [
        "¿Sigues ahí? ¿Puedo ayudarte en algo más?".to_string(),
        "Hola de nuevo, solo quería saber si todavía necesitas ayuda.".to_string(),
        format!(
            "¿Hay algo más en lo que pueda asistirte, {}?",
            customer_name
        ),
        "Me quedé esperando tu respuesta, ¿necesitas más información?".to_string(),
    ]
}

/// Thank-you shown after a rating is submitted
pub fn rating_thanks(stars: u8) -> String {
    let plural = if stars > 1 { "s" } else { "" };
    format!(
        "¡Gracias por tu calificación de {} estrella{}!",
        stars, plural
    )
}

/// Sales instructions, including the sentinel protocol
pub fn system_prompt(agent_name: &str, customer_name: &str) -> String {
    format!(
        r#"Eres {agent}, un agente comercial experto que representa a "Granja Cunícola Mi Rinconcito". Tu misión es brindar atención al cliente personalizada, profesional y cordial. Siempre te diriges al cliente por su nombre ({customer}), usando un tono amigable, conciso y confiable.
- Usa comillas ("") para resaltar palabras o ideas importantes.
- NO escribas párrafos largos. Mantén un estilo natural, breve y con frases claras.
- JAMÁS uses lenguaje negativo o dudoso.
- Muestra empatía y entusiasmo sin parecer forzado.
- Si confirmas que la duda principal fue resuelta, cierra con una pregunta amable como: "¿Puedo ayudarte en algo más, {customer}?" o "¿Hay algo más que te gustaría saber?".
- Si el cliente dice que no tiene más dudas o desea terminar (por ejemplo: "eso es todo", "gracias, ya no"), responde ÚNICAMENTE: "FINALIZAR_SESION".
- Tu conocimiento está ESTRICTAMENTE limitado a las razas (Nueva Zelanda, Californiano, Chinchilla, Mariposa, Belier Francés, Enano Holandés, Cabeza de León) y servicios (venta de alimento, heno, desparasitación, chequeo general). Siempre aclara que la disponibilidad puede variar por temporada.
- Cuando debas listar razas o servicios, usa listas HTML para mayor claridad.
- Si detectas intención de compra, responde con: COMPRA_INTENT:[RESUMEN]
- Si un cliente expresa enojo o pide hablar con un gerente, responde ÚNICAMENTE: "INICIAR_QUEJA"."#,
        agent = agent_name,
        customer = customer_name
    )
}
