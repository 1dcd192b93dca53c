use crate::{config::ServiceSpec, constants::AUTH_KEY_VAR};

/// Renders the Go reverse proxy for `spec`.
///
/// The program joins the tailnet as `spec.hostname`, keeps its client state in
/// `state_dir` (relative to its working directory), listens for Funnel traffic
/// on `:443` and forwards every request to `localhost:<port>` over plain HTTP.
/// The auth key is read from the process environment when the program starts.
/// Listener or server failure is fatal; restarts are left to systemd.
pub fn render_program(spec: &ServiceSpec, state_dir: &str) -> String {
    format!(
        r#"package main

import (
	"log"
	"net/http"
	"net/http/httputil"
	"os"

	"tailscale.com/tsnet"
)

func main() {{
	srv := &tsnet.Server{{
		Hostname: "{hostname}",
		AuthKey:  os.Getenv("{auth_key_var}"),
		Dir:      "{state_dir}",
	}}
	defer srv.Close()

	ln, err := srv.ListenFunnel("tcp", ":443")
	if err != nil {{
		log.Fatal(err)
	}}

	proxy := &httputil.ReverseProxy{{
		Director: func(r *http.Request) {{
			r.URL.Host = "localhost:{port}"
			r.URL.Scheme = "http"
		}},
	}}

	log.Println("Starting reverse proxy for {name}...")
	log.Fatal(http.Serve(ln, proxy))
}}
"#,
        hostname = spec.hostname,
        auth_key_var = AUTH_KEY_VAR,
        state_dir = state_dir,
        port = spec.port,
        name = spec.name,
    )
}
