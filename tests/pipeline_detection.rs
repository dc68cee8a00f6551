use motif::{
    checks::FeedbackKind,
    graph::SyntaxGraph,
    java::SourceFile,
    recognizers::Pattern,
    runner::RecognizerRunner,
};

/// Parses Java snippets into a linked graph, one snippet per file.
fn graph_of(sources: &[(&str, &str)]) -> SyntaxGraph {
    let mut graph = SyntaxGraph::new();
    for (origin, code) in sources {
        let file = SourceFile::from_source(code.to_string(), origin.to_string())
            .expect("source should parse");
        graph.add_file(&file);
    }
    graph.build_relations();
    graph
}

const SINGLETON: &str = r#"
public class Database {
    private static Database instance;

    private Database() {}

    public static Database getInstance() {
        if (instance == null) {
            instance = new Database();
        }
        return instance;
    }

    public void query(String sql) {}
}
"#;

#[test]
fn singleton_source_scores_high() {
    let graph = graph_of(&[("Database.java", SINGLETON)]);
    let runner = RecognizerRunner::builder().build();

    let results = runner
        .run_pattern(&graph, Pattern::Singleton)
        .expect("recognizer should be well formed");

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.entity, "Database");
    assert!(result.score >= 80, "score was {}", result.score);
    assert_eq!(result.feedback, FeedbackKind::Correct);
    assert!(
        result.failing_requirements().is_empty(),
        "unexpected failures: {:?}",
        result.failing_requirements()
    );
}

#[test]
fn singleton_with_public_constructor_is_knocked_out() {
    let code = SINGLETON.replace("private Database()", "public Database()");
    let graph = graph_of(&[("Database.java", &code)]);
    let runner = RecognizerRunner::builder().report_all(true).build();

    let results = runner
        .run_pattern(&graph, Pattern::Singleton)
        .expect("recognizer should be well formed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].feedback, FeedbackKind::Incorrect);
}

#[test]
fn observer_participants_are_found_across_files() {
    let observer = r#"
public interface Listener {
    void update(String event);
}
"#;
    let subject = r#"
import java.util.ArrayList;
import java.util.List;

public class EventBus {
    private List<Listener> listeners = new ArrayList<>();

    public void subscribe(Listener listener) {
        listeners.add(listener);
    }

    public void publish(String event) {
        for (Listener listener : listeners) {
            listener.update(event);
        }
    }
}
"#;
    let concrete = r#"
public class LogListener implements Listener {
    public void update(String event) {
        System.out.println(event);
    }
}
"#;
    let graph = graph_of(&[
        ("Listener.java", observer),
        ("EventBus.java", subject),
        ("LogListener.java", concrete),
    ]);
    let runner = RecognizerRunner::builder().build();

    let results = runner
        .run_pattern(&graph, Pattern::Observer)
        .expect("recognizer should be well formed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entity, "Listener");
    assert!(results[0].score >= 80, "score was {}", results[0].score);
}

#[test]
fn strategy_participants_are_found_across_files() {
    let strategy = r#"
public interface Router {
    int route(int from, int to);
}
"#;
    let context = r#"
public class Navigator {
    private Router router;

    public void setRouter(Router router) {
        this.router = router;
    }

    public int navigate(int from, int to) {
        return router.route(from, to);
    }
}
"#;
    let concrete = r#"
public class FastestRouter implements Router {
    public int route(int from, int to) {
        return to - from;
    }
}
"#;
    let graph = graph_of(&[
        ("Router.java", strategy),
        ("Navigator.java", context),
        ("FastestRouter.java", concrete),
    ]);
    let runner = RecognizerRunner::builder().build();

    let results = runner
        .run_pattern(&graph, Pattern::Strategy)
        .expect("recognizer should be well formed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entity, "Router");
}

#[test]
fn factory_method_participants_are_found_across_files() {
    let creator = r#"
public abstract class Dialog {
    public abstract Button createButton();
}
"#;
    let product = r#"
public interface Button {
    void paint();
}
"#;
    let concrete_creator = r#"
public class WindowsDialog extends Dialog {
    public Button createButton() {
        return new WindowsButton();
    }
}
"#;
    let concrete_product = r#"
public class WindowsButton implements Button {
    public void paint() {}
}
"#;
    let graph = graph_of(&[
        ("Dialog.java", creator),
        ("Button.java", product),
        ("WindowsDialog.java", concrete_creator),
        ("WindowsButton.java", concrete_product),
    ]);
    let runner = RecognizerRunner::builder().build();

    let results = runner
        .run_pattern(&graph, Pattern::FactoryMethod)
        .expect("recognizer should be well formed");

    let top = results.first().expect("Dialog should be detected");
    assert_eq!(top.entity, "Dialog");
    assert!(top.score >= 80, "score was {}", top.score);
}

#[test]
fn object_adapter_is_recognized() {
    let target = r#"
public interface MediaPlayer {
    void play(String file);
}
"#;
    let service = r#"
public class VlcEngine {
    public void playVlc(String file) {}
}
"#;
    let adapter = r#"
public class VlcAdapter implements MediaPlayer {
    private VlcEngine engine = new VlcEngine();

    public void play(String file) {
        engine.playVlc(file);
    }
}
"#;
    let graph = graph_of(&[
        ("MediaPlayer.java", target),
        ("VlcEngine.java", service),
        ("VlcAdapter.java", adapter),
    ]);
    let runner = RecognizerRunner::builder().build();

    let results = runner
        .run_pattern(&graph, Pattern::Adapter)
        .expect("recognizer should be well formed");

    let top = results.first().expect("VlcAdapter should be detected");
    assert_eq!(top.entity, "VlcAdapter");
    assert!(top.score >= 80, "score was {}", top.score);
}

#[test]
fn bridge_abstraction_is_recognized() {
    let implementation = r#"
public interface Renderer {
    void renderCircle(float radius);
}
"#;
    let abstraction = r#"
public abstract class Shape {
    protected Renderer renderer;

    public void refresh() {
        renderer.renderCircle(0);
    }

    public abstract void draw();
}
"#;
    let refined = r#"
public class Circle extends Shape {
    public void draw() {
        renderer.renderCircle(1.0f);
    }
}
"#;
    let concrete = r#"
public class VectorRenderer implements Renderer {
    public void renderCircle(float radius) {}
}
"#;
    let graph = graph_of(&[
        ("Renderer.java", implementation),
        ("Shape.java", abstraction),
        ("Circle.java", refined),
        ("VectorRenderer.java", concrete),
    ]);
    let runner = RecognizerRunner::builder().build();

    let results = runner
        .run_pattern(&graph, Pattern::Bridge)
        .expect("recognizer should be well formed");

    let top = results.first().expect("Shape should be detected");
    assert_eq!(top.entity, "Shape");
    assert!(top.score >= 80, "score was {}", top.score);
}

#[test]
fn unrelated_code_produces_no_detections() {
    let code = r#"
public class Calculator {
    public int add(int a, int b) {
        return a + b;
    }
}
"#;
    let graph = graph_of(&[("Calculator.java", code)]);
    let runner = RecognizerRunner::builder().build();

    for pattern in Pattern::ALL {
        let results = runner
            .run_pattern(&graph, pattern)
            .expect("recognizer should be well formed");
        assert!(results.is_empty(), "{pattern} matched Calculator");
    }
}
